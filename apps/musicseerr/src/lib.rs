//! MusicSeerr Backend Library
//!
//! Searches MusicBrainz and requests artists and albums from a Lidarr
//! instance. This library exposes modules for use in integration tests.

use axum::{
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

use config::Config;
use services::{LidarrClient, MusicBrainzClient};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub musicbrainz_client: Option<Arc<MusicBrainzClient>>,
    pub lidarr_client: Option<Arc<LidarrClient>>,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Get a reference to the MusicBrainz client, if configured.
    pub fn musicbrainz_client(&self) -> Option<&MusicBrainzClient> {
        self.musicbrainz_client.as_deref()
    }

    /// Get a reference to the Lidarr client, if an API key is configured.
    pub fn lidarr_client(&self) -> Option<&LidarrClient> {
        self.lidarr_client.as_deref()
    }

    /// Get the start time of the application.
    pub fn start_time(&self) -> std::time::Instant {
        self.start_time
    }
}

#[derive(Serialize)]
pub struct ApiResponse {
    pub message: String,
    pub version: String,
    pub uptime_secs: u64,
    pub lidarr_configured: bool,
}

pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<ApiResponse> {
    Json(ApiResponse {
        message: "MusicSeerr Backend is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time().elapsed().as_secs(),
        lidarr_configured: state.lidarr_client().is_some(),
    })
}

/// CORS policy; same-origin only when no origins are configured.
fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    if config.server.cors_origins.is_empty() {
        tracing::info!("CORS: No origins configured, same-origin only");
        return cors;
    }

    let origins: Vec<_> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    tracing::info!("CORS: Allowing origins {:?}", config.server.cors_origins);
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
