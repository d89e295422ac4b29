//! Rewind media server client
//!
//! Talks to the server's REST API: login, catalog browsing, watch progress
//! and HLS stream sessions. Session cookies set by the login response are
//! kept in a shared jar and replayed on every later request.

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::MediaApi;
use crate::models::{
    CreateStreamRequest, EpisodeInfo, HlsStreamProps, Library, LoginRequest, SeasonInfo,
    ShowInfo, StreamStatus, UserProgress,
};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Rewind API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not logged in or session expired (401)")]
    Unauthorized,

    #[error("Resource not found (404)")]
    NotFound,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Rewind API client
pub struct RewindClient {
    base_url: String,
    client: reqwest::Client,
    jar: Arc<Jar>,
}

impl RewindClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url,
            client,
            jar,
        })
    }

    /// Server base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a stream's playlist path against the server base URL
    pub fn playable_url(&self, props: &HlsStreamProps) -> Result<Url, ApiError> {
        let full = if props.url.starts_with("http://") || props.url.starts_with("https://") {
            props.url.clone()
        } else if props.url.starts_with('/') {
            format!("{}{}", self.base_url, props.url)
        } else {
            format!("{}/{}", self.base_url, props.url)
        };
        Url::parse(&full).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", full, e)))
    }

    /// `Cookie` header value the jar would send to `url`, if any
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        self.jar
            .cookies(url)
            .and_then(|v| v.to_str().ok().map(str::to_string))
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// GET an endpoint and parse its JSON body
    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        debug!(endpoint, "GET");
        let response = self
            .client
            .get(self.url(endpoint))
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::parse(response).await
    }

    /// POST a JSON body and parse the JSON response
    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(endpoint, "POST");
        let response = self
            .client
            .post(self.url(endpoint))
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        match response.status() {
            status if status.is_success() => {
                let body = response.text().await?;
                if body.trim().is_empty() {
                    return Err(ApiError::InvalidResponse("empty body".into()));
                }
                serde_json::from_str(&body)
                    .map_err(|e| ApiError::InvalidResponse(format!("JSON parse error: {}", e)))
            }
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            status => Err(ApiError::ServerError(status.as_u16())),
        }
    }
}

#[async_trait]
impl MediaApi for RewindClient {
    async fn login(&self, req: &LoginRequest) -> Result<u16, ApiError> {
        debug!(username = %req.username, "POST /api/auth/login");
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(req)
            .send()
            .await?;
        Ok(response.status().as_u16())
    }

    async fn list_libraries(&self) -> Result<Vec<Library>, ApiError> {
        self.get("/api/browse/libraries").await
    }

    async fn list_shows(&self, library_name: &str) -> Result<Vec<ShowInfo>, ApiError> {
        let endpoint = format!(
            "/api/browse/libraries/{}/shows",
            urlencoding::encode(library_name)
        );
        self.get(&endpoint).await
    }

    async fn list_seasons(&self, show_id: &str) -> Result<Vec<SeasonInfo>, ApiError> {
        let endpoint = format!("/api/browse/shows/{}/seasons", urlencoding::encode(show_id));
        self.get(&endpoint).await
    }

    async fn list_episodes(&self, season_id: &str) -> Result<Vec<EpisodeInfo>, ApiError> {
        let endpoint = format!(
            "/api/browse/seasons/{}/episodes",
            urlencoding::encode(season_id)
        );
        self.get(&endpoint).await
    }

    async fn get_user_progress(&self, episode_id: &str) -> Result<UserProgress, ApiError> {
        let endpoint = format!("/api/progress/episodes/{}", urlencoding::encode(episode_id));
        self.get(&endpoint).await
    }

    async fn create_stream(&self, req: &CreateStreamRequest) -> Result<HlsStreamProps, ApiError> {
        self.post("/api/stream/create", req).await
    }

    async fn heartbeat_stream(&self, stream_id: &str) -> Result<StreamStatus, ApiError> {
        let endpoint = format!("/api/stream/{}/heartbeat", urlencoding::encode(stream_id));
        self.get(&endpoint).await
    }
}
