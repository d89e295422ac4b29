//! Rewind API client tests
//!
//! Tests request shapes, response parsing, cookie replay and error mapping.

use mockito::{Matcher, Server};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use rewind::api::{ApiError, MediaApi, RewindClient};
use rewind::models::{CreateStreamRequest, EpisodeInfo, LoginRequest, StreamStatus, UserProgress};

// =============================================================================
// Login Tests
// =============================================================================

#[tokio::test]
async fn test_login_posts_credentials() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/api/auth/login")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "username": "alice",
            "password": "secret"
        })))
        .with_status(200)
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();
    let status = assert_ok!(client.login(&LoginRequest::new("alice", "secret")).await);

    mock.assert_async().await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_login_reports_rejection_status() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/api/auth/login")
        .with_status(401)
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();
    let status = client
        .login(&LoginRequest::new("alice", "wrong"))
        .await
        .unwrap();
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_session_cookie_is_replayed() {
    let mut server = Server::new_async().await;

    let _login = server
        .mock("POST", "/api/auth/login")
        .with_status(200)
        .with_header("set-cookie", "rewind_session=abc123; Path=/; HttpOnly")
        .create_async()
        .await;

    let libraries = server
        .mock("GET", "/api/browse/libraries")
        .match_header("cookie", Matcher::Regex("rewind_session=abc123".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"name": "Movies"}]"#)
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();
    client
        .login(&LoginRequest::new("alice", "secret"))
        .await
        .unwrap();
    let libs = client.list_libraries().await.unwrap();

    libraries.assert_async().await;
    assert_eq!(libs.len(), 1);

    let url = reqwest::Url::parse(&format!("{}/hls/s1/index.m3u8", server.url())).unwrap();
    let cookie = client.cookie_header(&url).expect("session cookie");
    assert!(cookie.contains("rewind_session=abc123"));
}

// =============================================================================
// Catalog Tests
// =============================================================================

#[tokio::test]
async fn test_list_libraries_parses_names() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/api/browse/libraries")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"name": "Movies"}, {"name": "TV"}]"#)
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();
    let libs = client.list_libraries().await.unwrap();

    mock.assert_async().await;
    let names: Vec<_> = libs.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Movies", "TV"]);
}

#[tokio::test]
async fn test_list_shows_encodes_library_name() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock(
            "GET",
            Matcher::Regex(r"^/api/browse/libraries/TV%20Shows/shows$".into()),
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": "bb", "title": "Breaking Bad"}]"#)
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();
    let shows = client.list_shows("TV Shows").await.unwrap();

    mock.assert_async().await;
    assert_eq!(shows[0].id, "bb");
    assert_eq!(shows[0].title, "Breaking Bad");
}

#[tokio::test]
async fn test_list_seasons_and_episodes() {
    let mut server = Server::new_async().await;

    let _seasons = server
        .mock("GET", "/api/browse/shows/bb/seasons")
        .with_status(200)
        .with_body(r#"[{"id": "bb-s1", "seasonNumber": 1}, {"id": "bb-s2", "seasonNumber": 2}]"#)
        .create_async()
        .await;

    let _episodes = server
        .mock("GET", "/api/browse/seasons/bb-s1/episodes")
        .with_status(200)
        .with_body(
            r#"[
                {"id": "bb-s1e1", "title": "Pilot", "libraryId": "tv", "episodeNumber": 1},
                {"id": "bb-s1e2", "title": "Cat's in the Bag...", "libraryId": "tv"}
            ]"#,
        )
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();

    let seasons = client.list_seasons("bb").await.unwrap();
    assert_eq!(seasons.len(), 2);
    assert_eq!(seasons[1].season_number, 2);

    let episodes = client.list_episodes("bb-s1").await.unwrap();
    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0].library_id, "tv");
    assert_eq!(episodes[0].episode_number, Some(1));
    assert_eq!(episodes[1].episode_number, None);
}

// =============================================================================
// Stream Tests
// =============================================================================

#[tokio::test]
async fn test_get_user_progress() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/progress/episodes/bb-s1e1")
        .with_status(200)
        .with_body(r#"{"duration": 754.25}"#)
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();
    let progress = client.get_user_progress("bb-s1e1").await.unwrap();
    assert_eq!(progress, UserProgress { duration: 754.25 });
}

#[tokio::test]
async fn test_create_stream_sends_camel_case_body() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/api/stream/create")
        .match_body(Matcher::Json(json!({
            "libraryId": "tv",
            "episodeId": "bb-s1e1",
            "startOffset": 754.25
        })))
        .with_status(200)
        .with_body(r#"{"id": "st-9", "url": "/api/stream/st-9/hls/index.m3u8"}"#)
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();
    let episode = EpisodeInfo::new("bb-s1e1", "Pilot", "tv");
    let req = CreateStreamRequest::resume(&episode, UserProgress { duration: 754.25 });
    let props = client.create_stream(&req).await.unwrap();

    mock.assert_async().await;
    assert_eq!(props.id, "st-9");
    assert_eq!(
        client.playable_url(&props).unwrap().as_str(),
        format!("{}/api/stream/st-9/hls/index.m3u8", server.url())
    );
}

#[tokio::test]
async fn test_heartbeat_parses_each_status() {
    let mut server = Server::new_async().await;

    for (id, body, expected) in [
        ("a", r#""pending""#, StreamStatus::Pending),
        ("b", r#""available""#, StreamStatus::Available),
        ("c", r#""canceled""#, StreamStatus::Canceled),
    ] {
        let _mock = server
            .mock("GET", format!("/api/stream/{}/heartbeat", id).as_str())
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = RewindClient::new(server.url()).unwrap();
        assert_eq!(client.heartbeat_stream(id).await.unwrap(), expected);
    }
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[tokio::test]
async fn test_unauthorized_maps_to_error() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/browse/libraries")
        .with_status(401)
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();
    let err = assert_err!(client.list_libraries().await);
    assert!(matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn test_not_found_maps_to_error() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/progress/episodes/missing")
        .with_status(404)
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();
    let err = client.get_user_progress("missing").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
}

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/api/stream/create")
        .with_status(503)
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();
    let episode = EpisodeInfo::new("e1", "Pilot", "tv");
    let err = client
        .create_stream(&CreateStreamRequest::resume(&episode, UserProgress::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ServerError(503)));
}

#[tokio::test]
async fn test_null_or_empty_body_is_invalid_response() {
    let mut server = Server::new_async().await;

    let _null = server
        .mock("GET", "/api/browse/libraries")
        .with_status(200)
        .with_body("null")
        .create_async()
        .await;

    let _empty = server
        .mock("POST", "/api/stream/create")
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();

    let err = client.list_libraries().await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));

    let episode = EpisodeInfo::new("e1", "Pilot", "tv");
    let err = client
        .create_stream(&CreateStreamRequest::resume(&episode, UserProgress::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_unknown_heartbeat_status_is_invalid() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/stream/s1/heartbeat")
        .with_status(200)
        .with_body(r#""exploded""#)
        .create_async()
        .await;

    let client = RewindClient::new(server.url()).unwrap();
    let err = client.heartbeat_stream("s1").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_connection_refused_is_request_failed() {
    // Nothing listens on port 9 (discard) in the test environment
    let client = RewindClient::new("http://127.0.0.1:9").unwrap();
    let err = client.list_libraries().await.unwrap_err();
    assert!(matches!(err, ApiError::RequestFailed(_)));
}
