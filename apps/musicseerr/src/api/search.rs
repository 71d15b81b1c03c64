//! Search API endpoint for MusicBrainz lookups.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ArtistSearchResult, ReleaseGroupSummary};
use crate::AppState;

const MIN_QUERY_CHARS: usize = 2;
const MAX_QUERY_CHARS: usize = 200;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Artist,
    Album,
}

/// Query parameters for search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default, rename = "type")]
    pub search_type: SearchType,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SearchResults {
    Artists(Vec<ArtistSearchResult>),
    Albums(Vec<ReleaseGroupSummary>),
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(rename = "type")]
    pub search_type: SearchType,
    pub count: usize,
    pub results: SearchResults,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/search?q=&type=artist|album
pub async fn search(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<SearchQuery>, AppError>,
) -> Result<Json<SearchResponse>> {
    let term = validate_query(&query.q)?;

    let mb_client = state.musicbrainz_client().ok_or_else(|| {
        AppError::ConfigurationMissing("MusicBrainz client not configured".to_string())
    })?;
    let limit = state.config.musicbrainz.search_limit;

    let (count, results) = match query.search_type {
        SearchType::Artist => {
            let artists: Vec<ArtistSearchResult> = mb_client
                .search_artists(term, limit)
                .await?
                .into_iter()
                .map(ArtistSearchResult::from)
                .collect();
            (artists.len(), SearchResults::Artists(artists))
        }
        SearchType::Album => {
            let albums: Vec<ReleaseGroupSummary> = mb_client
                .search_release_groups(term, limit)
                .await?
                .into_iter()
                .map(ReleaseGroupSummary::from)
                .collect();
            (albums.len(), SearchResults::Albums(albums))
        }
    };

    tracing::debug!(
        query = %term,
        kind = ?query.search_type,
        results = count,
        "MusicBrainz search"
    );

    Ok(Json(SearchResponse {
        query: term.to_string(),
        search_type: query.search_type,
        count,
        results,
    }))
}

/// Trim and bound a free-text query before anything is sent upstream.
pub fn validate_query(raw: &str) -> Result<&str> {
    let term = raw.trim();
    let chars = term.chars().count();
    if chars < MIN_QUERY_CHARS {
        return Err(AppError::Validation(
            "Search query must be at least 2 characters".to_string(),
        ));
    }
    if chars > MAX_QUERY_CHARS {
        return Err(AppError::Validation(
            "Search query too long (max 200 characters)".to_string(),
        ));
    }
    Ok(term)
}

// =============================================================================
// Router
// =============================================================================

pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_too_short_after_trim() {
        assert!(validate_query(" a ").is_err());
        assert!(validate_query("").is_err());
    }

    #[test]
    fn test_query_trimmed() {
        assert_eq!(validate_query("  radiohead ").unwrap(), "radiohead");
    }

    #[test]
    fn test_query_counts_characters_not_bytes() {
        assert!(validate_query("é").is_err());
        assert!(validate_query("ab").is_ok());
    }

    #[test]
    fn test_query_too_long() {
        assert!(validate_query(&"x".repeat(201)).is_err());
        assert!(validate_query(&"x".repeat(200)).is_ok());
    }
}
