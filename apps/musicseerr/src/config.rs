//! Configuration module for the MusicSeerr backend.
//!
//! Loads configuration from `config.toml` with environment variable overrides.

use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub musicbrainz: MusicBrainzConfig,
    #[serde(default)]
    pub lidarr: LidarrConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

/// MusicBrainz configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MusicBrainzConfig {
    #[serde(default = "default_mb_base_url")]
    pub base_url: String,
    #[serde(default = "default_contact")]
    pub contact: String,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            base_url: default_mb_base_url(),
            contact: default_contact(),
            rate_limit_ms: default_rate_limit(),
            retry_delay_ms: default_retry_delay(),
            search_limit: default_search_limit(),
        }
    }
}

impl MusicBrainzConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_mb_base_url() -> String {
    "https://musicbrainz.org/ws/2".to_string()
}

fn default_contact() -> String {
    "https://github.com/spencer-owens/pirate-orb".to_string()
}

fn default_rate_limit() -> u64 {
    1100 // 1 req/s fair-use limit plus margin
}

fn default_retry_delay() -> u64 {
    2000
}

fn default_search_limit() -> u32 {
    10
}

/// Lidarr configuration
#[derive(Clone, Deserialize)]
pub struct LidarrConfig {
    #[serde(default = "default_lidarr_url")]
    pub url: String,
    pub api_key: Option<String>,
    /// Pause after creating an artist, while Lidarr populates its albums.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    /// Album list lookups after an artist is created (1 = single lookup).
    #[serde(default = "default_album_lookup_attempts")]
    pub album_lookup_attempts: u32,
    #[serde(default = "default_queue_poll")]
    pub queue_poll_secs: u64,
}

// Custom Debug implementation to avoid exposing api_key
impl std::fmt::Debug for LidarrConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LidarrConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("album_lookup_attempts", &self.album_lookup_attempts)
            .field("queue_poll_secs", &self.queue_poll_secs)
            .finish()
    }
}

impl Default for LidarrConfig {
    fn default() -> Self {
        Self {
            url: default_lidarr_url(),
            api_key: None,
            settle_delay_ms: default_settle_delay(),
            album_lookup_attempts: default_album_lookup_attempts(),
            queue_poll_secs: default_queue_poll(),
        }
    }
}

impl LidarrConfig {
    /// Whether an API key is present; without one library features are disabled.
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn queue_poll_interval(&self) -> Duration {
        Duration::from_secs(self.queue_poll_secs)
    }
}

fn default_lidarr_url() -> String {
    "http://localhost:8686".to_string()
}

fn default_settle_delay() -> u64 {
    2000
}

fn default_album_lookup_attempts() -> u32 {
    1
}

fn default_queue_poll() -> u64 {
    10
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` in current directory (optional)
    /// 3. Environment variables with `MUSICSEERR_` prefix
    /// 4. `LIDARR_URL` / `LIDARR_API_KEY` (applied as overrides, so they win)
    ///
    /// Prefixed environment variables use double underscore for nesting:
    /// - `MUSICSEERR_SERVER__PORT=9000` sets `server.port`
    /// - `MUSICSEERR_LIDARR__API_KEY=...` sets `lidarr.api_key`
    pub fn load() -> Result<Self, AppError> {
        Self::load_from("config.toml")
    }

    /// Load configuration from a specific file path.
    pub fn load_from(config_path: &str) -> Result<Self, AppError> {
        let config = ConfigLoader::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("musicbrainz.base_url", default_mb_base_url())?
            .set_default("musicbrainz.rate_limit_ms", default_rate_limit())?
            .set_default("musicbrainz.retry_delay_ms", default_retry_delay())?
            .set_default("musicbrainz.search_limit", default_search_limit())?
            .set_default("lidarr.url", default_lidarr_url())?
            .set_default("lidarr.settle_delay_ms", default_settle_delay())?
            .set_default("lidarr.album_lookup_attempts", default_album_lookup_attempts())?
            .set_default("lidarr.queue_poll_secs", default_queue_poll())?
            .add_source(File::with_name(config_path).required(false))
            .set_override_option("lidarr.url", non_empty_env("LIDARR_URL"))?
            .set_override_option("lidarr.api_key", non_empty_env("LIDARR_API_KEY"))?
            // MUSICSEERR_LIDARR__URL=... -> lidarr.url
            .add_source(
                Environment::with_prefix("MUSICSEERR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for required fields.
    fn validate(&self) -> Result<(), AppError> {
        // A missing key only disables library features; handlers report it per request
        if !self.lidarr.is_configured() {
            tracing::warn!("Lidarr API key not configured - library features are disabled");
        }

        if self.lidarr.album_lookup_attempts == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "lidarr.album_lookup_attempts must be at least 1".to_string(),
            )));
        }

        if self.lidarr.queue_poll_secs == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "lidarr.queue_poll_secs must be at least 1".to_string(),
            )));
        }

        if self.musicbrainz.search_limit == 0 || self.musicbrainz.search_limit > 100 {
            return Err(AppError::Config(config::ConfigError::Message(format!(
                "musicbrainz.search_limit {} is out of range (1-100)",
                self.musicbrainz.search_limit
            ))));
        }

        Ok(())
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> std::net::SocketAddr {
        use std::net::{IpAddr, Ipv4Addr, SocketAddr};
        let ip: IpAddr = self.server.host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid host '{}', using 0.0.0.0", self.server.host);
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        });
        SocketAddr::new(ip, self.server.port)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::load_from("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.musicbrainz.rate_limit_ms, 1100);
        assert_eq!(config.musicbrainz.retry_delay_ms, 2000);
        assert_eq!(config.musicbrainz.search_limit, 10);
        assert_eq!(config.lidarr.settle_delay_ms, 2000);
        assert_eq!(config.lidarr.album_lookup_attempts, 1);
        assert_eq!(config.lidarr.queue_poll_secs, 10);
    }

    #[test]
    fn test_server_addr() {
        let config = Config::load_from("nonexistent.toml").unwrap();
        let addr = config.server_addr();
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_struct_defaults_match_loader() {
        let config = Config::default();
        assert_eq!(config.lidarr.url, "http://localhost:8686");
        assert_eq!(config.musicbrainz.base_url, "https://musicbrainz.org/ws/2");
        assert_eq!(config.musicbrainz.rate_limit(), Duration::from_millis(1100));
    }

    #[test]
    fn test_blank_api_key_is_not_configured() {
        let lidarr = LidarrConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!lidarr.is_configured());

        let lidarr = LidarrConfig {
            api_key: Some("abc123".to_string()),
            ..Default::default()
        };
        assert!(lidarr.is_configured());
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let lidarr = LidarrConfig {
            api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", lidarr);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_zero_lookup_attempts_rejected() {
        let config = Config {
            lidarr: LidarrConfig {
                album_lookup_attempts: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
