//! Test infrastructure for MusicSeerr backend integration tests.
//!
//! Provides a `TestApp` wrapper around `axum_test::TestServer`, and
//! `MockUpstream`, a scripted HTTP server standing in for MusicBrainz or Lidarr
//! that records every call it receives.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use axum_test::TestServer;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use musicseerr::config::{Config, LidarrConfig, MusicBrainzConfig};
use musicseerr::services::{LidarrClient, MusicBrainzClient};
use musicseerr::AppState;

pub const TEST_API_KEY: &str = "test-api-key";

// =============================================================================
// Mock upstream
// =============================================================================

/// One request received by a `MockUpstream`.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub at: Instant,
}

type RouteKey = (Method, String);

#[derive(Clone, Default)]
struct MockState {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    routes: Arc<Mutex<HashMap<RouteKey, VecDeque<(StatusCode, Value)>>>>,
}

/// Scripted upstream bound to an ephemeral port.
///
/// Responses queued for a route are served in order; the last one repeats.
/// Unscripted routes answer 404.
pub struct MockUpstream {
    addr: SocketAddr,
    state: MockState,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let state = MockState::default();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock upstream");
        let addr = listener.local_addr().expect("Mock upstream has no address");

        let app = Router::new().fallback(handle).with_state(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue a response for `method path`.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        let status = StatusCode::from_u16(status).expect("Invalid status code");
        self.state
            .routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back((status, body));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }

    /// Index of the first call matching `method path`.
    pub fn position_of(&self, method: Method, path: &str) -> Option<usize> {
        self.calls()
            .iter()
            .position(|c| c.method == method && c.path == path)
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    state.calls.lock().unwrap().push(RecordedCall {
        method: method.clone(),
        path: path.clone(),
        query,
        headers,
        body: serde_json::from_slice(&body).ok(),
        at: Instant::now(),
    });

    let mut routes = state.routes.lock().unwrap();
    let scripted = routes.get_mut(&(method, path)).and_then(|queue| {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    });

    match scripted {
        Some((status, body)) => (status, Json(body)).into_response(),
        None => {
            let body = Json(serde_json::json!({"message": "not mocked"}));
            (StatusCode::NOT_FOUND, body).into_response()
        }
    }
}

// =============================================================================
// Clients and config
// =============================================================================

/// Config with short delays so timing-dependent flows run quickly.
pub fn test_config(musicbrainz_url: Option<String>, lidarr_url: Option<String>) -> Config {
    Config {
        server: musicseerr::config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: Vec::new(),
        },
        musicbrainz: MusicBrainzConfig {
            base_url: musicbrainz_url.unwrap_or_else(|| "http://127.0.0.1:9".to_string()),
            rate_limit_ms: 50,
            retry_delay_ms: 20,
            ..Default::default()
        },
        lidarr: LidarrConfig {
            api_key: lidarr_url.as_ref().map(|_| TEST_API_KEY.to_string()),
            url: lidarr_url.unwrap_or_else(|| "http://127.0.0.1:9".to_string()),
            settle_delay_ms: 10,
            queue_poll_secs: 1,
            ..Default::default()
        },
    }
}

pub fn musicbrainz_client(config: &Config) -> MusicBrainzClient {
    MusicBrainzClient::new("musicseerr-tests", "0.0.0", &config.musicbrainz)
        .expect("Failed to create MusicBrainz client")
}

pub fn lidarr_client(url: &str) -> LidarrClient {
    LidarrClient::new(url, Some(TEST_API_KEY)).expect("Failed to create Lidarr client")
}

// =============================================================================
// TestApp
// =============================================================================

/// Test application wrapper around axum_test::TestServer.
pub struct TestApp {
    server: TestServer,
}

impl TestApp {
    /// Application with no upstream clients configured.
    pub async fn new() -> Self {
        Self::build(test_config(None, None), false, false)
    }

    /// Application talking to the given mock upstreams.
    pub async fn with_upstreams(
        musicbrainz: Option<&MockUpstream>,
        lidarr: Option<&MockUpstream>,
    ) -> Self {
        let config = test_config(musicbrainz.map(|m| m.url()), lidarr.map(|l| l.url()));
        Self::build(config, musicbrainz.is_some(), lidarr.is_some())
    }

    fn build(config: Config, with_musicbrainz: bool, with_lidarr: bool) -> Self {
        let state = test_state(config, with_musicbrainz, with_lidarr);
        let server =
            TestServer::new(musicseerr::app(state)).expect("Failed to create test server");

        Self { server }
    }

    /// Get a reference to the test server.
    ///
    /// ```ignore
    /// let response = app.server().get("/health").await;
    /// ```
    pub fn server(&self) -> &TestServer {
        &self.server
    }
}

fn test_state(config: Config, with_musicbrainz: bool, with_lidarr: bool) -> AppState {
    let musicbrainz_client = with_musicbrainz.then(|| Arc::new(musicbrainz_client(&config)));
    let lidarr_client = with_lidarr.then(|| {
        LidarrClient::new_shared(&config.lidarr).expect("Failed to create Lidarr client")
    });

    AppState {
        config: Arc::new(config),
        musicbrainz_client,
        lidarr_client,
        start_time: Instant::now(),
    }
}

/// Serve the full application on an ephemeral port and return its base URL.
///
/// Needed for streaming responses, which `TestServer` buffers to completion.
pub async fn spawn_app(lidarr: &MockUpstream) -> String {
    let config = test_config(None, Some(lidarr.url()));
    let app = musicseerr::app(test_state(config, false, true));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test app");
    let addr = listener.local_addr().expect("Test app has no address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://{}", addr)
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn lidarr_artist(id: i64, mbid: &str, name: &str) -> Value {
    serde_json::json!({
        "id": id,
        "artistName": name,
        "foreignArtistId": mbid,
        "monitored": true,
        "statistics": {"albumCount": 1, "trackFileCount": 0, "trackCount": 10}
    })
}

pub fn lidarr_album(id: i64, artist_id: i64, mbid: &str, monitored: bool) -> Value {
    serde_json::json!({
        "id": id,
        "title": format!("Album {}", id),
        "foreignAlbumId": mbid,
        "artistId": artist_id,
        "monitored": monitored,
        "albumType": "Album",
        "releaseDate": "2001-05-21T00:00:00Z",
        "anyEditionOk": true,
        "statistics": {"trackFileCount": 0, "trackCount": 10, "percentOfTracks": 0.0}
    })
}

/// Script the root folder and profile endpoints used when creating artists.
pub fn script_library_config(lidarr: &MockUpstream) {
    lidarr
        .respond(
            Method::GET,
            "/api/v1/rootfolder",
            200,
            serde_json::json!([{"id": 1, "path": "/data/music"}]),
        )
        .respond(
            Method::GET,
            "/api/v1/qualityprofile",
            200,
            serde_json::json!([{"id": 4, "name": "Lossless"}]),
        )
        .respond(
            Method::GET,
            "/api/v1/metadataprofile",
            200,
            serde_json::json!([{"id": 2, "name": "Standard"}]),
        );
}
