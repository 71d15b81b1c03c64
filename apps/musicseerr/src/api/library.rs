//! Library API endpoints backed by Lidarr.
//!
//! Every handler fails with `ConfigurationMissing` when no Lidarr API key is
//! configured. Library state is read fresh from Lidarr on every call.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use futures::Stream;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{LibraryAlbum, LibraryArtist, QueueItem, QueueView};
use crate::services::requests::{
    AlbumRequest, AlbumRequestOutcome, ArtistRequest, ArtistRequestOutcome,
};
use crate::services::{LidarrClient, RequestService};
use crate::AppState;

type EventStream = Pin<Box<dyn Stream<Item = std::result::Result<Event, Infallible>> + Send>>;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListArtistsQuery {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListAlbumsQuery {
    pub artist_id: Option<i64>,
    pub search: Option<String>,
    #[serde(default)]
    pub owned_only: bool,
}

fn lidarr(state: &AppState) -> Result<Arc<LidarrClient>> {
    state
        .lidarr_client
        .clone()
        .ok_or_else(|| AppError::ConfigurationMissing("Lidarr API key not configured".to_string()))
}

fn matches_search(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim) {
        Some(n) if !n.is_empty() => haystack.to_lowercase().contains(&n.to_lowercase()),
        _ => true,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/lidarr/artists
pub async fn list_artists(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListArtistsQuery>, AppError>,
) -> Result<Json<Vec<LibraryArtist>>> {
    let client = lidarr(&state)?;

    let mut artists: Vec<LibraryArtist> = client
        .list_artists()
        .await?
        .into_iter()
        .map(LibraryArtist::from)
        .filter(|a| matches_search(&a.name, query.search.as_deref()))
        .collect();
    artists.sort_by_key(|a| a.name.to_lowercase());

    Ok(Json(artists))
}

/// GET /api/lidarr/albums
pub async fn list_albums(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListAlbumsQuery>, AppError>,
) -> Result<Json<Vec<LibraryAlbum>>> {
    let client = lidarr(&state)?;

    let mut albums: Vec<LibraryAlbum> = client
        .list_albums(query.artist_id)
        .await?
        .into_iter()
        .map(LibraryAlbum::from)
        .filter(|a| matches_search(&a.title, query.search.as_deref()))
        .filter(|a| !query.owned_only || a.track_file_count > 0)
        .collect();
    // Newest first, undated last
    albums.sort_by(|a, b| b.release_date.cmp(&a.release_date));

    Ok(Json(albums))
}

/// GET /api/lidarr/wanted
pub async fn list_wanted(State(state): State<AppState>) -> Result<Json<Vec<LibraryAlbum>>> {
    let client = lidarr(&state)?;

    let wanted: Vec<LibraryAlbum> = client
        .list_albums(None)
        .await?
        .into_iter()
        .map(LibraryAlbum::from)
        .filter(LibraryAlbum::is_wanted)
        .collect();

    Ok(Json(wanted))
}

/// GET /api/lidarr/queue
pub async fn get_queue(State(state): State<AppState>) -> Result<Json<QueueView>> {
    let client = lidarr(&state)?;
    Ok(Json(fetch_queue(&client).await?))
}

async fn fetch_queue(client: &LidarrClient) -> Result<QueueView> {
    let page = client.get_queue().await?;
    Ok(QueueView {
        queue: page.records.into_iter().map(QueueItem::from).collect(),
        total_records: page.total_records,
    })
}

/// GET /api/lidarr/queue/stream
///
/// Emits a `queue` event every poll interval, or an `error` event carrying the
/// message when Lidarr could not be reached for that tick.
pub async fn queue_stream(State(state): State<AppState>) -> Result<Sse<EventStream>> {
    let client = lidarr(&state)?;
    let poll_interval = state.config.lidarr.queue_poll_interval();

    let stream: EventStream = Box::pin(stream! {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            match fetch_queue(&client).await {
                Ok(view) => match Event::default().event("queue").json_data(&view) {
                    Ok(event) => {
                        yield Ok(event);
                    }
                    Err(e) => {
                        tracing::error!("Failed to encode queue event: {}", e);
                    }
                },
                Err(e) => {
                    yield Ok(Event::default().event("error").data(e.to_string()));
                }
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// POST /api/lidarr/add-album
pub async fn add_album(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<AlbumRequest>, AppError>,
) -> Result<Json<AlbumRequestOutcome>> {
    let service = RequestService::new(lidarr(&state)?, &state.config.lidarr);
    Ok(Json(service.request_album(&request).await?))
}

/// POST /api/lidarr/add-artist
pub async fn add_artist(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<ArtistRequest>, AppError>,
) -> Result<Json<ArtistRequestOutcome>> {
    let service = RequestService::new(lidarr(&state)?, &state.config.lidarr);
    Ok(Json(service.request_artist(&request).await?))
}

// =============================================================================
// Router
// =============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/artists", get(list_artists))
        .route("/albums", get(list_albums))
        .route("/wanted", get(list_wanted))
        .route("/queue", get(get_queue))
        .route("/queue/stream", get(queue_stream))
        .route("/add-album", post(add_album))
        .route("/add-artist", post(add_artist))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_search_case_insensitive() {
        assert!(matches_search("Radiohead", Some("radio")));
        assert!(!matches_search("Radiohead", Some("blur")));
    }

    #[test]
    fn test_blank_search_matches_everything() {
        assert!(matches_search("Anything", None));
        assert!(matches_search("Anything", Some("   ")));
    }
}
