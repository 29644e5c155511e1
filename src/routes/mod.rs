use axum::{
    extract::Query,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::{self, extractors::CurrentSession},
    session::gate::{navigate, Navigation},
    state::AppState,
};

pub mod applications;
pub mod dashboard;
pub mod jobs;
pub mod optimize;
pub mod profile;
pub mod users;

/// Request body cap for routes that carry base64 uploads.
pub const UPLOAD_LIMIT: usize = 20 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(jobs::router())
        .merge(applications::router())
        .merge(users::router())
        .merge(profile::router())
        .merge(dashboard::router())
        .merge(optimize::router())
        .route("/navigate", get(navigate_to))
        .route("/health", get(|| async { "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct NavigateQuery {
    pub path: String,
}

/// Resolves a client path against the route table and the caller's session.
pub async fn navigate_to(
    CurrentSession(current): CurrentSession,
    Query(q): Query<NavigateQuery>,
) -> Json<Navigation> {
    Json(navigate(&q.path, &current))
}
