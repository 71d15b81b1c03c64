use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use musicseerr::config::Config;
use musicseerr::services::{LidarrClient, MusicBrainzClient};
use musicseerr::AppState;

fn init_tracing() {
    // RUST_LOG environment variable controls log levels
    // Default: debug for our crate, info for axum, warn for dependencies
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("musicseerr=debug,tower_http=debug,axum=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    // Initialize tracing first so we can log configuration loading
    init_tracing();

    tracing::info!("Starting MusicSeerr Backend v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::load() {
        Ok(cfg) => {
            tracing::info!("Configuration loaded successfully");
            tracing::debug!("Server: {}:{}", cfg.server.host, cfg.server.port);
            tracing::debug!("Lidarr: {:?}", cfg.lidarr);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let musicbrainz_client = match MusicBrainzClient::new_shared(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.musicbrainz,
    ) {
        Ok(client) => {
            tracing::info!("MusicBrainz client initialized");
            Some(client)
        }
        Err(e) => {
            tracing::error!("Failed to create MusicBrainz client: {}", e);
            None
        }
    };

    let lidarr_client = if config.lidarr.is_configured() {
        match LidarrClient::new_shared(&config.lidarr) {
            Ok(client) => {
                tracing::info!("Lidarr client initialized for {}", client.base_url());
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to create Lidarr client: {}", e);
                None
            }
        }
    } else {
        None
    };

    let addr = config.server_addr();

    let state = AppState {
        config: Arc::new(config),
        musicbrainz_client,
        lidarr_client,
        start_time: std::time::Instant::now(),
    };

    let app = musicseerr::app(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("MusicSeerr Backend listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
