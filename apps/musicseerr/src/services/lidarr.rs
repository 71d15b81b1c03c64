//! Lidarr service client.
//!
//! Thin authenticated wrapper over the Lidarr v1 REST API. Every request
//! carries the API key as the `apikey` query parameter. Failures are never
//! retried here; any non-2xx response becomes an error embedding the status
//! and the response body verbatim.

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::LidarrConfig;
use crate::error::{AppError, Result};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ROOT_PATH: &str = "/music";
const DEFAULT_PROFILE_ID: i64 = 1;

/// Lidarr API client.
pub struct LidarrClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LidarrClient {
    /// Create a new Lidarr client.
    ///
    /// Returns `ConfigurationMissing` if the API key is absent or blank.
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AppError::ConfigurationMissing("Lidarr API key not configured".to_string())
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Create a client from the `[lidarr]` configuration section, wrapped in Arc.
    pub fn new_shared(config: &LidarrConfig) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(&config.url, config.api_key.as_deref())?))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =========================================================================
    // Library configuration
    // =========================================================================

    /// Discover the root folder and default profiles.
    ///
    /// Always takes the first entry of each list; choosing among several
    /// configured profiles is not supported.
    pub async fn get_config(&self) -> Result<LibraryConfig> {
        tracing::debug!("Fetching Lidarr root folder and profiles");

        let (roots, quality, metadata) = futures::try_join!(
            self.get::<Vec<RootFolder>>("/api/v1/rootfolder", &[]),
            self.get::<Vec<ProfileRef>>("/api/v1/qualityprofile", &[]),
            self.get::<Vec<ProfileRef>>("/api/v1/metadataprofile", &[]),
        )?;

        Ok(LibraryConfig {
            root_path: roots
                .into_iter()
                .next()
                .map(|r| r.path)
                .unwrap_or_else(|| DEFAULT_ROOT_PATH.to_string()),
            quality_profile_id: quality.first().map(|p| p.id).unwrap_or(DEFAULT_PROFILE_ID),
            metadata_profile_id: metadata.first().map(|p| p.id).unwrap_or(DEFAULT_PROFILE_ID),
        })
    }

    // =========================================================================
    // Artists
    // =========================================================================

    pub async fn list_artists(&self) -> Result<Vec<LidarrArtist>> {
        tracing::debug!("Listing Lidarr artists");
        self.get("/api/v1/artist", &[]).await
    }

    pub async fn create_artist(&self, artist: &NewArtist) -> Result<LidarrArtist> {
        tracing::debug!(
            foreign_artist_id = %artist.foreign_artist_id,
            name = %artist.artist_name,
            monitor = ?artist.add_options.monitor,
            "Creating Lidarr artist"
        );
        self.send_json(Method::POST, "/api/v1/artist", artist).await
    }

    // =========================================================================
    // Albums
    // =========================================================================

    /// List albums, optionally restricted to one artist.
    pub async fn list_albums(&self, artist_id: Option<i64>) -> Result<Vec<LidarrAlbum>> {
        tracing::debug!(artist_id = ?artist_id, "Listing Lidarr albums");

        match artist_id {
            Some(id) => {
                self.get("/api/v1/album", &[("artistId", id.to_string())])
                    .await
            }
            None => self.get("/api/v1/album", &[]).await,
        }
    }

    /// Update an album's monitored flag, sending the full album back.
    pub async fn set_album_monitored(
        &self,
        album: &LidarrAlbum,
        monitored: bool,
    ) -> Result<LidarrAlbum> {
        tracing::debug!(album_id = album.id, monitored, "Updating Lidarr album monitoring");

        let mut updated = album.clone();
        updated.monitored = monitored;

        self.send_json(Method::PUT, &format!("/api/v1/album/{}", album.id), &updated)
            .await
    }

    // =========================================================================
    // Commands & queue
    // =========================================================================

    pub async fn dispatch_command(&self, command: &Command) -> Result<CommandResponse> {
        tracing::debug!(
            name = %command.name,
            album_ids = ?command.album_ids,
            "Dispatching Lidarr command"
        );
        self.send_json(Method::POST, "/api/v1/command", command).await
    }

    pub async fn get_queue(&self) -> Result<QueuePage> {
        tracing::debug!("Fetching Lidarr queue");
        self.get(
            "/api/v1/queue",
            &[
                ("includeArtist", "true".to_string()),
                ("includeAlbum", "true".to_string()),
            ],
        )
        .await
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    async fn get<T>(&self, path: &str, params: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let request = self.client.get(self.url(path)).query(params);
        self.execute(request, &Method::GET, path).await
    }

    async fn send_json<T, B>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.client.request(method.clone(), self.url(path)).json(body);
        self.execute(request, &method, path).await
    }

    async fn execute<T>(&self, request: RequestBuilder, method: &Method, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        // reqwest errors carry the URL, which contains the API key
        let response = request
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                AppError::Upstream(format!(
                    "Lidarr request {} {} failed: {}",
                    method,
                    path,
                    e.without_url()
                ))
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Lidarr {}: {}",
                status.as_u16(),
                body
            )));
        }

        response.json::<T>().await.map_err(|e| {
            AppError::Upstream(format!(
                "Failed to parse Lidarr response from {}: {}",
                path,
                e.without_url()
            ))
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Root path and default profile ids used when adding an artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryConfig {
    pub root_path: String,
    pub quality_profile_id: i64,
    pub metadata_profile_id: i64,
}

/// Which existing albums Lidarr should monitor when an artist is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorPolicy {
    All,
    None,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddArtistOptions {
    pub monitor: MonitorPolicy,
    pub search_for_missing_albums: bool,
}

/// Body of `POST /api/v1/artist`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArtist {
    pub foreign_artist_id: String,
    pub artist_name: String,
    pub path: String,
    pub quality_profile_id: i64,
    pub metadata_profile_id: i64,
    pub monitored: bool,
    pub monitor_new_items: String,
    pub add_options: AddArtistOptions,
}

impl NewArtist {
    /// Build a monitored artist placed under the library root.
    ///
    /// `MonitorPolicy::None` adds the artist without monitoring or searching
    /// any of its existing albums.
    pub fn new(
        config: &LibraryConfig,
        foreign_artist_id: &str,
        artist_name: &str,
        monitor: MonitorPolicy,
    ) -> Self {
        Self {
            foreign_artist_id: foreign_artist_id.to_string(),
            artist_name: artist_name.to_string(),
            path: artist_path(&config.root_path, artist_name),
            quality_profile_id: config.quality_profile_id,
            metadata_profile_id: config.metadata_profile_id,
            monitored: true,
            monitor_new_items: "all".to_string(),
            add_options: AddArtistOptions {
                monitor,
                search_for_missing_albums: monitor == MonitorPolicy::All,
            },
        }
    }
}

/// `<root>/<name>` with path separators in the name replaced by `-`.
pub fn artist_path(root_path: &str, artist_name: &str) -> String {
    let folder: String = artist_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    format!("{}/{}", root_path.trim_end_matches('/'), folder)
}

/// Body of `POST /api/v1/command`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub name: String,
    pub album_ids: Vec<i64>,
}

impl Command {
    pub fn album_search(album_ids: Vec<i64>) -> Self {
        Self {
            name: "AlbumSearch".to_string(),
            album_ids,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct RootFolder {
    path: String,
}

#[derive(Debug, Deserialize)]
struct ProfileRef {
    id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtistStatistics {
    pub album_count: u32,
    pub track_file_count: u32,
    pub track_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LidarrArtist {
    pub id: i64,
    pub artist_name: String,
    pub foreign_artist_id: String,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub statistics: ArtistStatistics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlbumStatistics {
    pub track_file_count: u32,
    pub track_count: u32,
    /// 0-100, computed by Lidarr
    pub percent_of_tracks: f64,
}

/// Album as Lidarr returns it.
///
/// Fields not modelled here are kept in `extra` so a PUT sends the album back
/// unchanged apart from what we edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LidarrAlbum {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub foreign_album_id: String,
    pub artist_id: i64,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub statistics: AlbumStatistics,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePage {
    #[serde(default)]
    pub records: Vec<QueueRecord>,
    #[serde(default)]
    pub total_records: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRecord {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    pub tracked_download_status: Option<String>,
    pub tracked_download_state: Option<String>,
    #[serde(default)]
    pub size: f64,
    #[serde(default, rename = "sizeleft")]
    pub size_left: f64,
    #[serde(rename = "timeleft")]
    pub time_left: Option<String>,
    pub artist: Option<QueueArtist>,
    pub album: Option<QueueAlbum>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueArtist {
    pub artist_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueAlbum {
    pub title: String,
}
