//! Remote media API
//!
//! - `MediaApi`: the REST operations the client consumes
//! - `RewindClient`: HTTP implementation with a shared cookie jar

pub mod rewind;

pub use rewind::{ApiError, RewindClient};

use async_trait::async_trait;

use crate::models::{
    CreateStreamRequest, EpisodeInfo, HlsStreamProps, Library, LoginRequest, SeasonInfo,
    ShowInfo, StreamStatus, UserProgress,
};

/// Operations offered by a Rewind server
///
/// `login` reports the raw HTTP status; everything else maps non-success
/// statuses and unparseable bodies to [`ApiError`].
#[async_trait]
pub trait MediaApi: Send + Sync + 'static {
    async fn login(&self, req: &LoginRequest) -> Result<u16, ApiError>;

    async fn list_libraries(&self) -> Result<Vec<Library>, ApiError>;

    async fn list_shows(&self, library_name: &str) -> Result<Vec<ShowInfo>, ApiError>;

    async fn list_seasons(&self, show_id: &str) -> Result<Vec<SeasonInfo>, ApiError>;

    async fn list_episodes(&self, season_id: &str) -> Result<Vec<EpisodeInfo>, ApiError>;

    async fn get_user_progress(&self, episode_id: &str) -> Result<UserProgress, ApiError>;

    async fn create_stream(&self, req: &CreateStreamRequest) -> Result<HlsStreamProps, ApiError>;

    async fn heartbeat_stream(&self, stream_id: &str) -> Result<StreamStatus, ApiError>;
}
