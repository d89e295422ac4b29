//! Data structures for the Rewind client
//!
//! Shared models organized by domain:
//! - **Catalog**: libraries, shows, seasons and episodes served by the browse API
//! - **Auth**: login request payload
//! - **Streams**: stream creation, HLS props and heartbeat status
//!
//! All wire types use camelCase JSON to match the server contract.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Catalog Models
// =============================================================================

/// A top-level media library (e.g. "Movies", "TV")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    pub name: String,
}

impl Library {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A show inside a library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowInfo {
    pub id: String,
    pub title: String,
}

impl fmt::Display for ShowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.title, self.id)
    }
}

/// A season of a show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonInfo {
    pub id: String,
    pub season_number: u32,
}

impl fmt::Display for SeasonInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Season {} [{}]", self.season_number, self.id)
    }
}

/// A playable episode
///
/// `library_id` is required to create a stream; the episode and season
/// numbers are informational and only present when the server sends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeInfo {
    pub id: String,
    pub title: String,
    pub library_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_number: Option<u32>,
}

impl EpisodeInfo {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        library_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            library_id: library_id.into(),
            season_id: None,
            episode_number: None,
        }
    }
}

impl fmt::Display for EpisodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.episode_number {
            Some(n) => write!(f, "E{:02} {} [{}]", n, self.title, self.id),
            None => write!(f, "{} [{}]", self.title, self.id),
        }
    }
}

// =============================================================================
// Auth Models
// =============================================================================

/// Credentials sent to the login endpoint, passed through verbatim
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep passwords out of logs.
impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// =============================================================================
// Progress Models
// =============================================================================

/// Saved watch progress for an episode
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// Seconds already watched; used as the stream's start offset
    #[serde(default)]
    pub duration: f64,
}

impl fmt::Display for UserProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.duration.max(0.0) as u64;
        write!(f, "Watched {}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
    }
}

// =============================================================================
// Stream Models
// =============================================================================

/// Body of the create-stream call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStreamRequest {
    pub library_id: String,
    pub episode_id: String,
    pub start_offset: f64,
}

impl CreateStreamRequest {
    /// Build a request that resumes `episode` at `progress`
    pub fn resume(episode: &EpisodeInfo, progress: UserProgress) -> Self {
        Self {
            library_id: episode.library_id.clone(),
            episode_id: episode.id.clone(),
            start_offset: progress.duration,
        }
    }
}

/// Properties of a created HLS stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HlsStreamProps {
    /// Server-assigned stream id, used for heartbeats
    pub id: String,
    /// Playlist path relative to the server base URL
    pub url: String,
}

/// Stream status as reported by the heartbeat endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Pending,
    Available,
    Canceled,
}

impl StreamStatus {
    /// Whether the session should keep polling after this status
    pub fn is_live(&self) -> bool {
        matches!(self, StreamStatus::Pending | StreamStatus::Available)
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStatus::Pending => write!(f, "pending"),
            StreamStatus::Available => write!(f, "available"),
            StreamStatus::Canceled => write!(f, "canceled"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
