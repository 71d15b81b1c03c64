//! MusicBrainz service client.
//!
//! Provides methods to search and fetch music metadata from the MusicBrainz API.
//! Every call goes through one process-wide rate limiter so the whole process
//! stays under MusicBrainz's fair-use limit, and a 503 is retried exactly once.

use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::MusicBrainzConfig;
use crate::error::{AppError, Result};

const COVER_ART_BASE: &str = "https://coverartarchive.org";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_RATE_LIMIT_MS: u64 = 60_000;

// =============================================================================
// Rate Limiter
// =============================================================================

/// Single shared last-request timestamp.
///
/// The lock is held across the sleep, so concurrent callers queue up behind
/// each other instead of all waking at the same instant.
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified minimum interval between requests.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    /// Wait until the rate limit allows another request, then claim the slot.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Record a request issued outside of `wait` (the 503 retry).
    pub async fn touch(&self) {
        *self.last_request.lock().await = Some(Instant::now());
    }
}

// =============================================================================
// MusicBrainz Client
// =============================================================================

/// MusicBrainz API client for fetching music metadata.
pub struct MusicBrainzClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
    retry_delay: Duration,
}

impl MusicBrainzClient {
    /// Create a new MusicBrainz client.
    ///
    /// MusicBrainz requires a proper User-Agent header with application name,
    /// version, and contact information.
    ///
    /// # Errors
    /// Returns an error if the name, version, or contact is blank, or if the
    /// rate limit is unreasonably high (max 60000ms).
    pub fn new(app_name: &str, app_version: &str, config: &MusicBrainzConfig) -> Result<Self> {
        if app_name.trim().is_empty() {
            return Err(AppError::Internal(
                "MusicBrainz app name cannot be empty".to_string(),
            ));
        }

        if app_version.trim().is_empty() {
            return Err(AppError::Internal(
                "MusicBrainz app version cannot be empty".to_string(),
            ));
        }

        if config.contact.trim().is_empty() {
            return Err(AppError::Internal(
                "MusicBrainz contact information cannot be empty".to_string(),
            ));
        }

        if config.rate_limit_ms < 1000 {
            tracing::warn!(
                rate_limit_ms = config.rate_limit_ms,
                "Rate limit is below the MusicBrainz minimum of 1000ms, expect 503 responses"
            );
        }

        if config.rate_limit_ms > MAX_RATE_LIMIT_MS {
            return Err(AppError::Internal(format!(
                "Rate limit {}ms is unreasonably high (max {}ms)",
                config.rate_limit_ms, MAX_RATE_LIMIT_MS
            )));
        }

        let user_agent = format!("{}/{} ({})", app_name, app_version, config.contact);

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::new(config.rate_limit()),
            retry_delay: config.retry_delay(),
        })
    }

    /// Create a new MusicBrainz client wrapped in Arc for shared access.
    pub fn new_shared(
        app_name: &str,
        app_version: &str,
        config: &MusicBrainzConfig,
    ) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(app_name, app_version, config)?))
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Search for artists by name.
    ///
    /// An empty result list is a successful response.
    pub async fn search_artists(&self, query: &str, limit: u32) -> Result<Vec<MbArtist>> {
        tracing::debug!(query = %query, limit, "Searching MusicBrainz artists");

        let params = [
            ("query", format!("artist:{}", query)),
            ("fmt", "json".to_string()),
            ("limit", limit.to_string()),
        ];

        let response: MbArtistSearch = self.get_json("/artist", &params).await?;
        Ok(response.artists)
    }

    /// Search for release groups (albums) by title.
    pub async fn search_release_groups(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<MbReleaseGroup>> {
        tracing::debug!(query = %query, limit, "Searching MusicBrainz release groups");

        let params = [
            ("query", format!("releasegroup:{}", query)),
            ("fmt", "json".to_string()),
            ("limit", limit.to_string()),
        ];

        let response: MbReleaseGroupSearch = self.get_json("/release-group", &params).await?;
        Ok(response.release_groups)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Get an artist including its release groups.
    pub async fn get_artist(&self, mbid: &str) -> Result<MbArtistDetails> {
        tracing::debug!(mbid = %mbid, "Fetching MusicBrainz artist");

        let params = [
            ("inc", "release-groups".to_string()),
            ("fmt", "json".to_string()),
        ];

        self.get_json(&format!("/artist/{}", mbid), &params).await
    }

    /// Get a release group including its releases and artist credit.
    pub async fn get_release_group(&self, mbid: &str) -> Result<MbReleaseGroupDetails> {
        tracing::debug!(mbid = %mbid, "Fetching MusicBrainz release group");

        let params = [
            ("inc", "releases+artist-credits".to_string()),
            ("fmt", "json".to_string()),
        ];

        self.get_json(&format!("/release-group/{}", mbid), &params)
            .await
    }

    /// Get a release including its media, recordings and credits.
    pub async fn get_release_tracks(&self, release_mbid: &str) -> Result<MbReleaseDetails> {
        tracing::debug!(mbid = %release_mbid, "Fetching MusicBrainz release tracks");

        let params = [
            ("inc", "recordings+artist-credits".to_string()),
            ("fmt", "json".to_string()),
        ];

        self.get_json(&format!("/release/{}", release_mbid), &params)
            .await
    }

    /// Front cover URL for a release group on the Cover Art Archive.
    ///
    /// # Arguments
    /// * `release_group_mbid` - MusicBrainz release group ID
    /// * `size` - Image size: "250", "500", "1200"
    pub fn cover_url(release_group_mbid: &str, size: &str) -> String {
        format!(
            "{}/release-group/{}/front-{}",
            COVER_ART_BASE, release_group_mbid, size
        )
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Rate-limited GET with a single retry on 503.
    async fn get_json<T>(&self, path: &str, params: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.rate_limiter.wait().await;

        let mut response = self.send(path, params).await?;

        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            tracing::warn!(
                path = %path,
                delay_ms = self.retry_delay.as_millis() as u64,
                "MusicBrainz returned 503, retrying once"
            );
            tokio::time::sleep(self.retry_delay).await;
            self.rate_limiter.touch().await;
            response = self.send(path, params).await?;
        }

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "MusicBrainz resource {} (status 404)",
                path
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "MusicBrainz {}: {}",
                status.as_u16(),
                body
            )));
        }

        response.json::<T>().await.map_err(|e| {
            AppError::Upstream(format!(
                "Failed to parse MusicBrainz response from {}: {}",
                path, e
            ))
        })
    }

    async fn send(&self, path: &str, params: &[(&str, String)]) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);

        self.client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                AppError::Upstream(format!("MusicBrainz request to {} failed: {}", path, e))
            })
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct MbArtistSearch {
    #[serde(default)]
    artists: Vec<MbArtist>,
}

#[derive(Debug, Deserialize)]
struct MbReleaseGroupSearch {
    #[serde(default, rename = "release-groups")]
    release_groups: Vec<MbReleaseGroup>,
}

/// Artist search hit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MbArtist {
    pub id: String,
    pub name: String,
    pub sort_name: Option<String>,
    pub disambiguation: Option<String>,
    /// Person, Group, Orchestra, Choir, Character, Other
    #[serde(rename = "type")]
    pub artist_type: Option<String>,
    /// ISO 3166-1 alpha-2
    pub country: Option<String>,
    pub life_span: Option<LifeSpan>,
    /// Search relevance (0-100)
    pub score: Option<u8>,
}

/// Artist lookup with release groups.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MbArtistDetails {
    pub id: String,
    pub name: String,
    pub disambiguation: Option<String>,
    #[serde(rename = "type")]
    pub artist_type: Option<String>,
    pub country: Option<String>,
    pub life_span: Option<LifeSpan>,
    #[serde(default)]
    pub release_groups: Vec<MbReleaseGroup>,
}

/// Life span of an artist or group. Dates are YYYY, YYYY-MM or YYYY-MM-DD.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LifeSpan {
    pub begin: Option<String>,
    pub end: Option<String>,
    pub ended: Option<bool>,
}

/// Release group (album abstracted over editions).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MbReleaseGroup {
    pub id: String,
    pub title: String,
    /// Album, Single, EP, Broadcast, Other
    pub primary_type: Option<String>,
    /// Compilation, Live, Remix, Soundtrack, ...
    #[serde(default)]
    pub secondary_types: Vec<String>,
    pub first_release_date: Option<String>,
    #[serde(default)]
    pub artist_credit: Vec<ArtistCredit>,
    pub score: Option<u8>,
}

/// Release group lookup with releases.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MbReleaseGroupDetails {
    pub id: String,
    pub title: String,
    pub primary_type: Option<String>,
    #[serde(default)]
    pub secondary_types: Vec<String>,
    pub first_release_date: Option<String>,
    #[serde(default)]
    pub artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    pub releases: Vec<MbRelease>,
}

/// One edition of a release group.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MbRelease {
    pub id: String,
    pub title: String,
    /// Official, Promotion, Bootleg, Pseudo-Release
    pub status: Option<String>,
    pub country: Option<String>,
    pub date: Option<String>,
    pub track_count: Option<u32>,
}

/// Release lookup with track listing.
#[derive(Debug, Clone, Deserialize)]
pub struct MbReleaseDetails {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub media: Vec<MbMedium>,
}

/// Disc or side.
#[derive(Debug, Clone, Deserialize)]
pub struct MbMedium {
    pub position: u32,
    pub format: Option<String>,
    #[serde(default)]
    pub tracks: Vec<MbTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MbTrack {
    pub id: String,
    pub title: String,
    pub position: u32,
    /// Milliseconds
    pub length: Option<u64>,
}

/// Artist credit entry; the credited name may differ from the artist's name.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistCredit {
    pub artist: MbArtistRef,
    pub name: Option<String>,
    pub joinphrase: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MbArtistRef {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Tests
// =============================================================================
