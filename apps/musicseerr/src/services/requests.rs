//! Request flows: put an album (or a whole artist) into the Lidarr library.
//!
//! Album requests are a strictly ordered sequence of Lidarr calls:
//! find or create the artist, locate the album, monitor it, search it.
//! Nothing is retried except the optional album lookup after artist creation,
//! and an artist created along the way is never rolled back.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::LidarrConfig;
use crate::error::{AppError, Result};
use crate::services::lidarr::{
    Command, LidarrAlbum, LidarrArtist, LidarrClient, MonitorPolicy, NewArtist,
};

pub const ALBUM_NOT_IN_PROFILE_MESSAGE: &str =
    "Artist added. Album may not be in Lidarr metadata profile; try a broader profile.";

/// Body of `POST /api/lidarr/add-album`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRequest {
    #[serde(default)]
    pub album_mbid: String,
    #[serde(default)]
    pub artist_mbid: String,
    #[serde(default)]
    pub artist_name: String,
}

/// Body of `POST /api/lidarr/add-artist`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRequest {
    #[serde(default)]
    pub artist_mbid: String,
    #[serde(default)]
    pub artist_name: String,
}

/// Result of an album request.
///
/// `success` is true for partial outcomes too; `album_found` tells them apart.
#[derive(Debug, Serialize)]
pub struct AlbumRequestOutcome {
    pub success: bool,
    pub album_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<i64>,
    pub artist_id: i64,
    pub artist_added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArtistRequestOutcome {
    pub success: bool,
    pub artist_id: i64,
    pub artist_added: bool,
}

/// Runs request flows against one Lidarr instance.
pub struct RequestService {
    lidarr: Arc<LidarrClient>,
    settle_delay: Duration,
    album_lookup_attempts: u32,
}

impl RequestService {
    pub fn new(lidarr: Arc<LidarrClient>, config: &LidarrConfig) -> Self {
        Self {
            lidarr,
            settle_delay: config.settle_delay(),
            album_lookup_attempts: config.album_lookup_attempts.max(1),
        }
    }

    /// Ensure the artist exists, then monitor and search one album.
    pub async fn request_album(&self, request: &AlbumRequest) -> Result<AlbumRequestOutcome> {
        let album_mbid = required(&request.album_mbid, "album_mbid")?;
        let artist_mbid = required(&request.artist_mbid, "artist_mbid")?;
        // Lidarr gets the name exactly as given; only blankness is checked
        required(&request.artist_name, "artist_name")?;
        let artist_name = request.artist_name.as_str();

        tracing::info!(album_mbid, artist_mbid, artist_name, "Requesting album");

        let (artist, artist_added) = match self.find_artist(artist_mbid).await? {
            Some(artist) => (artist, false),
            None => {
                let artist = self
                    .create_artist(artist_mbid, artist_name, MonitorPolicy::None)
                    .await?;
                // Lidarr fills in the artist's albums asynchronously
                tokio::time::sleep(self.settle_delay).await;
                (artist, true)
            }
        };

        let attempts = if artist_added { self.album_lookup_attempts } else { 1 };
        let Some(album) = self.find_album(artist.id, album_mbid, attempts).await? else {
            tracing::warn!(
                artist_id = artist.id,
                album_mbid,
                artist_added,
                "Album not found in Lidarr after artist lookup"
            );
            return Ok(AlbumRequestOutcome {
                success: true,
                album_found: false,
                album_id: None,
                artist_id: artist.id,
                artist_added,
                message: Some(ALBUM_NOT_IN_PROFILE_MESSAGE.to_string()),
            });
        };

        if !album.monitored {
            self.lidarr.set_album_monitored(&album, true).await?;
        }

        let command = self
            .lidarr
            .dispatch_command(&Command::album_search(vec![album.id]))
            .await?;

        tracing::info!(
            album_id = album.id,
            artist_id = artist.id,
            command_id = command.id,
            "Album requested"
        );

        Ok(AlbumRequestOutcome {
            success: true,
            album_found: true,
            album_id: Some(album.id),
            artist_id: artist.id,
            artist_added,
            message: None,
        })
    }

    /// Add an artist with every album monitored and searched.
    ///
    /// An artist already in the library is returned untouched.
    pub async fn request_artist(&self, request: &ArtistRequest) -> Result<ArtistRequestOutcome> {
        let artist_mbid = required(&request.artist_mbid, "artist_mbid")?;
        required(&request.artist_name, "artist_name")?;
        let artist_name = request.artist_name.as_str();

        if let Some(artist) = self.find_artist(artist_mbid).await? {
            tracing::debug!(artist_id = artist.id, "Artist already in library");
            return Ok(ArtistRequestOutcome {
                success: true,
                artist_id: artist.id,
                artist_added: false,
            });
        }

        let artist = self
            .create_artist(artist_mbid, artist_name, MonitorPolicy::All)
            .await?;

        tracing::info!(artist_id = artist.id, artist_name, "Artist requested");

        Ok(ArtistRequestOutcome {
            success: true,
            artist_id: artist.id,
            artist_added: true,
        })
    }

    async fn find_artist(&self, artist_mbid: &str) -> Result<Option<LidarrArtist>> {
        let artists = self.lidarr.list_artists().await?;
        Ok(artists
            .into_iter()
            .find(|a| a.foreign_artist_id == artist_mbid))
    }

    async fn create_artist(
        &self,
        artist_mbid: &str,
        artist_name: &str,
        monitor: MonitorPolicy,
    ) -> Result<LidarrArtist> {
        let library = self.lidarr.get_config().await?;
        let new_artist = NewArtist::new(&library, artist_mbid, artist_name, monitor);
        self.lidarr.create_artist(&new_artist).await
    }

    async fn find_album(
        &self,
        artist_id: i64,
        album_mbid: &str,
        attempts: u32,
    ) -> Result<Option<LidarrAlbum>> {
        for attempt in 1..=attempts {
            let albums = self.lidarr.list_albums(Some(artist_id)).await?;
            if let Some(album) = albums.into_iter().find(|a| a.foreign_album_id == album_mbid) {
                return Ok(Some(album));
            }
            if attempt < attempts {
                tracing::debug!(artist_id, attempt, "Album not listed yet, waiting");
                tokio::time::sleep(self.settle_delay).await;
            }
        }
        Ok(None)
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(value)
}
