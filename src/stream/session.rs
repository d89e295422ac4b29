//! Stream session controller
//!
//! Drives the lifecycle of the one active HLS stream: fetch resume progress,
//! create the stream, then heartbeat it until the server cancels it or the
//! user navigates away. Navigation changes bump a generation counter; a
//! session keeps polling only while the token it was started with is still
//! current. Teardown is cooperative: an in-flight heartbeat always completes,
//! the loop just never schedules the next one.
//!
//! The generation lives behind a mutex that is also held while a session
//! publishes, so a write can never land after the view moved on.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::api::MediaApi;
use crate::models::{CreateStreamRequest, EpisodeInfo, HlsStreamProps, StreamStatus};
use crate::state::StateCell;

// =============================================================================
// Stream State
// =============================================================================

/// Observable status of the current stream
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamState {
    /// No live stream (initial, or canceled by the server)
    #[default]
    Canceled,
    /// Transcode is starting up
    Pending,
    /// Playlist is ready to play
    Available,
    /// Creating or heartbeating the stream failed
    Unavailable(String),
}

impl StreamState {
    pub fn is_available(&self) -> bool {
        matches!(self, StreamState::Available)
    }

    /// Terminal states end the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Canceled | StreamState::Unavailable(_))
    }
}

impl From<StreamStatus> for StreamState {
    fn from(status: StreamStatus) -> Self {
        match status {
            StreamStatus::Pending => StreamState::Pending,
            StreamStatus::Available => StreamState::Available,
            StreamStatus::Canceled => StreamState::Canceled,
        }
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Canceled => write!(f, "canceled"),
            StreamState::Pending => write!(f, "pending"),
            StreamState::Available => write!(f, "available"),
            StreamState::Unavailable(reason) => write!(f, "unavailable: {}", reason),
        }
    }
}

// =============================================================================
// Poll Policy
// =============================================================================

/// Heartbeat intervals keyed by the last reported status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay while the transcode is starting
    pub pending: Duration,
    /// Keep-alive delay during playback
    pub available: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            pending: Duration::from_millis(500),
            available: Duration::from_secs(15),
        }
    }
}

impl PollPolicy {
    /// Delay before the next heartbeat, or `None` when polling must stop
    pub fn interval(&self, status: StreamStatus) -> Option<Duration> {
        if !status.is_live() {
            return None;
        }
        match status {
            StreamStatus::Available => Some(self.available),
            _ => Some(self.pending),
        }
    }
}

// =============================================================================
// Session Controller
// =============================================================================

/// Generation token minted on every view change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SessionToken(u64);

/// How a session's polling loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Server reported the stream as canceled
    Canceled,
    /// Navigation moved on; the session was abandoned client-side
    Superseded,
    /// Stream creation or a heartbeat failed
    Unavailable(String),
}

/// Snapshot of the session attached to the player view
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSession {
    pub episode: EpisodeInfo,
    pub props: Option<HlsStreamProps>,
    pub state: StreamState,
}

/// Owns the stream state cells and the view generation counter
#[derive(Debug)]
pub struct StreamController {
    generation: Mutex<u64>,
    policy: PollPolicy,
    props: StateCell<Option<HlsStreamProps>>,
    state: StateCell<StreamState>,
}

impl StreamController {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            generation: Mutex::new(0),
            policy,
            props: StateCell::new(None),
            state: StateCell::new(StreamState::Canceled),
        }
    }

    /// Supersede every running session and mint a token for a new one
    ///
    /// Props are cleared and the state is `Pending` before any other
    /// session can publish.
    pub fn begin(&self) -> SessionToken {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.props.set(None);
        self.state.set(StreamState::Pending);
        SessionToken(*generation)
    }

    /// Supersede every running session and forget its props and status
    pub fn reset(&self) {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.props.set(None);
        self.state.set(StreamState::Canceled);
    }

    pub fn is_current(&self, token: SessionToken) -> bool {
        *self.generation.lock() == token.0
    }

    /// Run `f` only if `token` is current, holding the generation lock
    ///
    /// `begin` and `reset` wait for `f` to return, so nothing `f` writes
    /// can outlive the session it belongs to.
    pub fn if_current<R>(&self, token: SessionToken, f: impl FnOnce() -> R) -> Option<R> {
        let generation = self.generation.lock();
        (*generation == token.0).then(f)
    }

    fn publish_state(&self, token: SessionToken, state: StreamState) -> bool {
        self.if_current(token, || self.state.set(state)).is_some()
    }

    pub fn props(&self) -> &StateCell<Option<HlsStreamProps>> {
        &self.props
    }

    pub fn state(&self) -> &StateCell<StreamState> {
        &self.state
    }

    /// Run a full session for `episode` until it ends or is superseded
    ///
    /// Results of calls that complete after the token went stale are
    /// discarded, so an old session never overwrites a newer one's state.
    pub async fn run<C: MediaApi + ?Sized>(
        &self,
        api: &C,
        episode: &EpisodeInfo,
        token: SessionToken,
    ) -> SessionOutcome {
        let progress = match api.get_user_progress(&episode.id).await {
            Ok(progress) => progress,
            Err(e) => {
                warn!(episode = %episode.id, error = %e, "No saved progress, starting from 0");
                Default::default()
            }
        };
        if !self.is_current(token) {
            return SessionOutcome::Superseded;
        }

        let request = CreateStreamRequest::resume(episode, progress);
        let props = match api.create_stream(&request).await {
            Ok(props) => props,
            Err(e) => {
                let reason = e.to_string();
                warn!(episode = %episode.id, error = %reason, "Stream creation failed");
                if !self.publish_state(token, StreamState::Unavailable(reason.clone())) {
                    return SessionOutcome::Superseded;
                }
                return SessionOutcome::Unavailable(reason);
            }
        };
        if self
            .if_current(token, || self.props.set(Some(props.clone())))
            .is_none()
        {
            return SessionOutcome::Superseded;
        }
        info!(
            episode = %episode.id,
            stream = %props.id,
            offset = request.start_offset,
            "Stream created"
        );

        loop {
            let status = match api.heartbeat_stream(&props.id).await {
                Ok(status) => status,
                Err(e) => {
                    let reason = e.to_string();
                    warn!(stream = %props.id, error = %reason, "Heartbeat failed");
                    if !self.publish_state(token, StreamState::Unavailable(reason.clone())) {
                        return SessionOutcome::Superseded;
                    }
                    return SessionOutcome::Unavailable(reason);
                }
            };
            if !self.publish_state(token, status.into()) {
                return SessionOutcome::Superseded;
            }
            debug!(stream = %props.id, %status, "Heartbeat");

            match self.policy.interval(status) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => {
                    info!(stream = %props.id, "Stream canceled by server");
                    return SessionOutcome::Canceled;
                }
            }

            if !self.is_current(token) {
                debug!(stream = %props.id, "Player closed, stopping heartbeats");
                return SessionOutcome::Superseded;
            }
        }
    }
}

impl Default for StreamController {
    fn default() -> Self {
        Self::new(PollPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_intervals() {
        let policy = PollPolicy::default();
        assert_eq!(
            policy.interval(StreamStatus::Pending),
            Some(Duration::from_millis(500))
        );
        assert_eq!(
            policy.interval(StreamStatus::Available),
            Some(Duration::from_secs(15))
        );
        assert_eq!(policy.interval(StreamStatus::Canceled), None);
    }

    #[test]
    fn test_begin_invalidates_previous_token() {
        let controller = StreamController::default();
        let first = controller.begin();
        assert!(controller.is_current(first));

        let second = controller.begin();
        assert!(!controller.is_current(first));
        assert!(controller.is_current(second));
        assert!(second > first);

        controller.reset();
        assert!(!controller.is_current(second));
    }

    #[test]
    fn test_begin_and_reset() {
        let controller = StreamController::default();
        assert_eq!(controller.state().get(), StreamState::Canceled);

        controller.begin();
        assert_eq!(controller.state().get(), StreamState::Pending);
        assert!(controller.props().get().is_none());

        controller.reset();
        assert_eq!(controller.state().get(), StreamState::Canceled);
    }

    #[test]
    fn test_stale_token_cannot_publish() {
        let controller = StreamController::default();
        let old = controller.begin();
        let new = controller.begin();

        assert!(!controller.publish_state(old, StreamState::Available));
        assert_eq!(controller.state().get(), StreamState::Pending);

        assert!(controller.publish_state(new, StreamState::Available));
        assert_eq!(controller.state().get(), StreamState::Available);
        assert_eq!(controller.if_current(old, || 1), None);
    }

    #[test]
    fn test_stream_state_from_status() {
        assert_eq!(StreamState::from(StreamStatus::Pending), StreamState::Pending);
        assert!(StreamState::from(StreamStatus::Available).is_available());
        assert!(StreamState::from(StreamStatus::Canceled).is_terminal());
        assert!(StreamState::Unavailable("boom".into()).is_terminal());
        assert!(!StreamState::Pending.is_terminal());
    }

    #[test]
    fn test_stream_state_display() {
        assert_eq!(StreamState::Available.to_string(), "available");
        assert_eq!(
            StreamState::Unavailable("404".into()).to_string(),
            "unavailable: 404"
        );
    }
}
