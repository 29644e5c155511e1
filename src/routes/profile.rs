use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::UPLOAD_LIMIT;
use crate::{
    auth::extractors::AuthSession,
    error::AppResult,
    facade::{ProfileUpdate, ProfileView},
    state::AppState,
    store::types::Profile,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route(
            "/profile/cv",
            put(upload_cv).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
}

/// PUT /profile/cv { cv_base64: "..." } (plain base64 or a data URL)
#[derive(Debug, Deserialize)]
pub struct CvBody {
    pub cv_base64: String,
}

pub async fn get_profile(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> AppResult<Json<ProfileView>> {
    Ok(Json(state.facade.profile_view(&session).await?))
}

#[instrument(skip(state, session, update))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<Profile>> {
    Ok(Json(state.facade.update_profile(&session, update).await?))
}

#[instrument(skip(state, session, body))]
pub async fn upload_cv(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(body): Json<CvBody>,
) -> AppResult<Json<ProfileView>> {
    Ok(Json(state.facade.upload_cv(&session, &body.cv_base64).await?))
}
