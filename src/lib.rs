//! Rewind - client for the Rewind media server
//!
//! A thin view model over the server's REST API: login, catalog browsing
//! (library → show → season → episode) and HLS stream sessions kept alive
//! by heartbeats.
//!
//! # Modules
//!
//! - `models` - Catalog entities and wire payloads
//! - `api` - `MediaApi` trait and the HTTP `RewindClient`
//! - `state` - Observable single-value state cells
//! - `stream` - Stream session controller
//! - `app` - Login/navigation state machines and the view model
//! - `config` - Config file and credential lookup
//! - `cli` / `commands` - Command line front end

pub mod models;
pub mod api;
pub mod state;
pub mod stream;
pub mod app;
pub mod config;
pub mod cli;
pub mod commands;

// Re-export commonly used types
pub use models::{
    Library, ShowInfo, SeasonInfo, EpisodeInfo,
    LoginRequest, UserProgress,
    CreateStreamRequest, HlsStreamProps, StreamStatus,
};

pub use api::{ApiError, MediaApi, RewindClient};
pub use app::{App, AppError, BrowserState, LoginState, Resource, ViewState};
pub use stream::{PollPolicy, StreamState};
