//! API endpoint handlers for the MusicSeerr backend.

pub mod catalog;
pub mod library;
pub mod search;

use axum::Router;

use crate::AppState;

/// All `/api` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(search::router())
        .merge(catalog::router())
        .nest("/lidarr", library::router())
}
