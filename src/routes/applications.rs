use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthSession, error::AppResult, state::AppState,
    store::types::ApplicationStatus,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/applications/:id/status", put(set_status))
        .route("/applications/:id/attachment", get(attachment))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicationStatusBody {
    pub status: ApplicationStatus,
}

#[instrument(skip(state, session))]
pub async fn set_status(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
    Json(body): Json<ApplicationStatusBody>,
) -> AppResult<Json<ApplicationStatusBody>> {
    let status = state
        .facade
        .set_application_status(&session, id, body.status)
        .await?;
    Ok(Json(ApplicationStatusBody { status }))
}

/// 307 to a short-lived link for the uploaded résumé.
#[instrument(skip(state, session))]
pub async fn attachment(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
) -> AppResult<Redirect> {
    let url = state.facade.attachment_url(&session, id).await?;
    Ok(Redirect::temporary(&url))
}
