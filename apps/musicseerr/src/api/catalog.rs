//! Artist and album pages backed by MusicBrainz.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::{AppError, Result};
use crate::models::{ArtistView, ReleaseGroupRef};
use crate::services::{catalog, MusicBrainzClient};
use crate::AppState;

fn musicbrainz(state: &AppState) -> Result<&MusicBrainzClient> {
    state.musicbrainz_client().ok_or_else(|| {
        AppError::ConfigurationMissing("MusicBrainz client not configured".to_string())
    })
}

fn require_mbid(mbid: &str) -> Result<&str> {
    let mbid = mbid.trim();
    if mbid.is_empty() {
        return Err(AppError::Validation("mbid is required".to_string()));
    }
    Ok(mbid)
}

/// GET /api/artist/:mbid
pub async fn get_artist(
    State(state): State<AppState>,
    Path(mbid): Path<String>,
) -> Result<Json<ArtistView>> {
    let mbid = require_mbid(&mbid)?;
    let view = catalog::artist_view(musicbrainz(&state)?, mbid).await?;
    Ok(Json(view))
}

/// GET /api/album/:mbid
pub async fn get_album(
    State(state): State<AppState>,
    Path(mbid): Path<String>,
) -> Result<Json<ReleaseGroupRef>> {
    let mbid = require_mbid(&mbid)?;
    let view = catalog::release_group_view(musicbrainz(&state)?, mbid).await?;
    Ok(Json(view))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/artist/:mbid", get(get_artist))
        .route("/album/:mbid", get(get_album))
}
