//! App state and view-model logic
//!
//! Holds the login, browser and view state machines plus the catalog lists,
//! and wires state transitions to their side effects: every browser change
//! triggers exactly one catalog load, every view change either starts a
//! stream session or reloads the browser list.
//!
//! All side effects run as spawned tokio tasks. The methods that spawn
//! return the task's `JoinHandle` so callers (the CLI, tests) can wait on
//! them; UI-style callers may simply drop it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiError, MediaApi};
use crate::models::{EpisodeInfo, HlsStreamProps, Library, LoginRequest, SeasonInfo, ShowInfo};
use crate::state::StateCell;
use crate::stream::{
    PollPolicy, SessionOutcome, SessionToken, StreamController, StreamSession, StreamState,
};

// =============================================================================
// State Enums
// =============================================================================

/// Authentication state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginState {
    #[default]
    LoggedOut,
    PendingLogin,
    LoggedIn,
}

/// Which catalog screen is shown
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BrowserState {
    #[default]
    Home,
    Library(Library),
    Show(ShowInfo),
    Season(SeasonInfo),
    Episode(EpisodeInfo),
}

/// Outer view: the catalog browser or the player for one episode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Browser,
    EpisodePlayer(EpisodeInfo),
}

// =============================================================================
// Errors
// =============================================================================

/// Catalog resource a load was fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Libraries,
    Shows(String),
    Seasons(String),
    Episodes(String),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Libraries => write!(f, "libraries"),
            Resource::Shows(library) => write!(f, "shows of library '{}'", library),
            Resource::Seasons(show) => write!(f, "seasons of show '{}'", show),
            Resource::Episodes(season) => write!(f, "episodes of season '{}'", season),
        }
    }
}

/// Errors surfaced to the UI layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Failed to load {resource}: {reason}")]
    LoadFailed { resource: Resource, reason: String },

    #[error("Stream unavailable: {0}")]
    StreamUnavailable(String),
}

// =============================================================================
// App
// =============================================================================

struct Inner<C> {
    api: Arc<C>,

    login_state: StateCell<LoginState>,
    login_attempt: AtomicU64,

    browser_state: StateCell<BrowserState>,
    view_state: StateCell<ViewState>,

    libraries: StateCell<Vec<Library>>,
    shows: StateCell<Vec<ShowInfo>>,
    seasons: StateCell<Vec<SeasonInfo>>,
    episodes: StateCell<Vec<EpisodeInfo>>,

    last_error: StateCell<Option<AppError>>,
    stream: StreamController,
}

/// View model shared by the UI layer and its spawned tasks
///
/// Cloning is cheap and every clone observes the same state.
pub struct App<C: MediaApi> {
    inner: Arc<Inner<C>>,
}

impl<C: MediaApi> Clone for App<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: MediaApi> App<C> {
    /// Create an App with the default heartbeat intervals
    pub fn new(api: C) -> Self {
        Self::with_policy(Arc::new(api), PollPolicy::default())
    }

    /// Create an App sharing `api` with the caller
    pub fn with_policy(api: Arc<C>, policy: PollPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                login_state: StateCell::new(LoginState::LoggedOut),
                login_attempt: AtomicU64::new(0),
                browser_state: StateCell::new(BrowserState::Home),
                view_state: StateCell::new(ViewState::Browser),
                libraries: StateCell::new(Vec::new()),
                shows: StateCell::new(Vec::new()),
                seasons: StateCell::new(Vec::new()),
                episodes: StateCell::new(Vec::new()),
                last_error: StateCell::new(None),
                stream: StreamController::new(policy),
            }),
        }
    }

    pub fn api(&self) -> &C {
        &self.inner.api
    }

    // -------------------------------------------------------------------------
    // Authentication
    // -------------------------------------------------------------------------

    /// Start a login attempt
    ///
    /// The state is `PendingLogin` as soon as this returns. A response that
    /// arrives after a newer attempt started is ignored. On success the
    /// returned task also waits for the Home list to load.
    pub fn login(&self, req: LoginRequest) -> JoinHandle<()> {
        let attempt = self.inner.login_attempt.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.login_state.set(LoginState::PendingLogin);
        info!(username = %req.username, "Logging in");

        let app = self.clone();
        tokio::spawn(async move {
            let result = app.inner.api.login(&req).await;
            if app.inner.login_attempt.load(Ordering::SeqCst) != attempt {
                debug!(attempt, "Dropping stale login response");
                return;
            }

            let (next, home) = match result {
                Ok(200) => {
                    info!("Logged in");
                    let home = app.set_browser_state(BrowserState::Home);
                    (LoginState::LoggedIn, home)
                }
                Ok(status) => {
                    warn!(status, "Login rejected");
                    (LoginState::LoggedOut, None)
                }
                Err(e) => {
                    warn!(error = %e, "Login request failed");
                    (LoginState::LoggedOut, None)
                }
            };
            app.inner.login_state.set(next);

            if let Some(home) = home {
                if let Err(e) = home.await {
                    warn!(error = %e, "Home load task failed");
                }
            }
        })
    }

    /// Drop back to the login screen and stop any running stream
    pub fn logout(&self) {
        self.inner.login_attempt.fetch_add(1, Ordering::SeqCst);
        self.inner.stream.reset();
        self.inner.view_state.set(ViewState::Browser);
        self.inner.login_state.set(LoginState::LoggedOut);
        info!("Logged out");
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Switch catalog screen and load its list
    ///
    /// Returns the load task, or `None` for `Episode` which needs no fetch.
    pub fn set_browser_state(&self, next: BrowserState) -> Option<JoinHandle<()>> {
        debug!(state = ?next, "Browser state");
        self.inner.browser_state.set(next.clone());
        match next {
            BrowserState::Home => Some(self.load_libraries()),
            BrowserState::Library(library) => Some(self.load_shows(library.name)),
            BrowserState::Show(show) => Some(self.load_seasons(show.id)),
            BrowserState::Season(season) => Some(self.load_episodes(season.id)),
            BrowserState::Episode(_) => None,
        }
    }

    /// Switch between the browser and the player
    ///
    /// Opening the player starts a new stream session and supersedes the
    /// previous one. Returning to the browser reloads the current list.
    pub fn set_view_state(&self, next: ViewState) -> Option<JoinHandle<()>> {
        match next {
            ViewState::EpisodePlayer(episode) => {
                let token = self.inner.stream.begin();
                self.inner
                    .view_state
                    .set(ViewState::EpisodePlayer(episode.clone()));
                Some(self.spawn_session(episode, token))
            }
            ViewState::Browser => {
                self.inner.stream.reset();
                self.inner.view_state.set(ViewState::Browser);
                self.set_browser_state(self.browser_state())
            }
        }
    }

    fn spawn_session(&self, episode: EpisodeInfo, token: SessionToken) -> JoinHandle<()> {
        info!(episode = %episode.id, title = %episode.title, "Opening player");
        let app = self.clone();
        tokio::spawn(async move {
            let inner = &app.inner;
            let outcome = inner.stream.run(inner.api.as_ref(), &episode, token).await;
            debug!(episode = %episode.id, ?outcome, "Session ended");
            if let SessionOutcome::Unavailable(reason) = outcome {
                inner.stream.if_current(token, || {
                    inner
                        .last_error
                        .set(Some(AppError::StreamUnavailable(reason)))
                });
            }
        })
    }

    // -------------------------------------------------------------------------
    // Catalog Loads
    // -------------------------------------------------------------------------

    pub fn load_libraries(&self) -> JoinHandle<()> {
        let app = self.clone();
        tokio::spawn(async move {
            let result = app.inner.api.list_libraries().await;
            if let Some(libraries) = app.loaded(Resource::Libraries, result) {
                app.inner.libraries.set(libraries);
            }
        })
    }

    pub fn load_shows(&self, library_name: impl Into<String>) -> JoinHandle<()> {
        let library_name = library_name.into();
        let app = self.clone();
        tokio::spawn(async move {
            let result = app.inner.api.list_shows(&library_name).await;
            if let Some(shows) = app.loaded(Resource::Shows(library_name), result) {
                app.inner.shows.set(shows);
            }
        })
    }

    pub fn load_seasons(&self, show_id: impl Into<String>) -> JoinHandle<()> {
        let show_id = show_id.into();
        let app = self.clone();
        tokio::spawn(async move {
            let result = app.inner.api.list_seasons(&show_id).await;
            if let Some(seasons) = app.loaded(Resource::Seasons(show_id), result) {
                app.inner.seasons.set(seasons);
            }
        })
    }

    pub fn load_episodes(&self, season_id: impl Into<String>) -> JoinHandle<()> {
        let season_id = season_id.into();
        let app = self.clone();
        tokio::spawn(async move {
            let result = app.inner.api.list_episodes(&season_id).await;
            if let Some(episodes) = app.loaded(Resource::Episodes(season_id), result) {
                app.inner.episodes.set(episodes);
            }
        })
    }

    /// Unwrap a load result, publishing `LoadFailed` on error
    fn loaded<T>(&self, resource: Resource, result: Result<Vec<T>, ApiError>) -> Option<Vec<T>> {
        match result {
            Ok(items) => {
                debug!(%resource, count = items.len(), "Loaded");
                Some(items)
            }
            Err(e) => {
                warn!(%resource, error = %e, "Load failed");
                self.inner.last_error.set(Some(AppError::LoadFailed {
                    resource,
                    reason: e.to_string(),
                }));
                None
            }
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn login_state(&self) -> LoginState {
        self.inner.login_state.get()
    }

    pub fn browser_state(&self) -> BrowserState {
        self.inner.browser_state.get()
    }

    pub fn view_state(&self) -> ViewState {
        self.inner.view_state.get()
    }

    pub fn libraries(&self) -> Vec<Library> {
        self.inner.libraries.get()
    }

    pub fn shows(&self) -> Vec<ShowInfo> {
        self.inner.shows.get()
    }

    pub fn seasons(&self) -> Vec<SeasonInfo> {
        self.inner.seasons.get()
    }

    pub fn episodes(&self) -> Vec<EpisodeInfo> {
        self.inner.episodes.get()
    }

    pub fn stream_state(&self) -> StreamState {
        self.inner.stream.state().get()
    }

    pub fn stream_props(&self) -> Option<HlsStreamProps> {
        self.inner.stream.props().get()
    }

    pub fn last_error(&self) -> Option<AppError> {
        self.inner.last_error.get()
    }

    pub fn clear_error(&self) {
        self.inner.last_error.set(None);
    }

    /// Session attached to the player view, if the player is open
    pub fn stream_session(&self) -> Option<StreamSession> {
        match self.view_state() {
            ViewState::EpisodePlayer(episode) => Some(StreamSession {
                episode,
                props: self.stream_props(),
                state: self.stream_state(),
            }),
            ViewState::Browser => None,
        }
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    pub fn subscribe_login_state(&self) -> watch::Receiver<LoginState> {
        self.inner.login_state.subscribe()
    }

    pub fn subscribe_browser_state(&self) -> watch::Receiver<BrowserState> {
        self.inner.browser_state.subscribe()
    }

    pub fn subscribe_view_state(&self) -> watch::Receiver<ViewState> {
        self.inner.view_state.subscribe()
    }

    pub fn subscribe_libraries(&self) -> watch::Receiver<Vec<Library>> {
        self.inner.libraries.subscribe()
    }

    pub fn subscribe_shows(&self) -> watch::Receiver<Vec<ShowInfo>> {
        self.inner.shows.subscribe()
    }

    pub fn subscribe_seasons(&self) -> watch::Receiver<Vec<SeasonInfo>> {
        self.inner.seasons.subscribe()
    }

    pub fn subscribe_episodes(&self) -> watch::Receiver<Vec<EpisodeInfo>> {
        self.inner.episodes.subscribe()
    }

    pub fn subscribe_stream_state(&self) -> watch::Receiver<StreamState> {
        self.inner.stream.state().subscribe()
    }

    pub fn subscribe_stream_props(&self) -> watch::Receiver<Option<HlsStreamProps>> {
        self.inner.stream.props().subscribe()
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<Option<AppError>> {
        self.inner.last_error.subscribe()
    }
}
