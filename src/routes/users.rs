use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::{AdminOnly, RequireRole},
    error::AppResult,
    session::Role,
    state::AppState,
    store::types::Profile,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/active", put(set_active))
        .route("/users/:id/role", put(set_role))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveBody {
    pub active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleBody {
    pub role: Role,
}

pub async fn list_users(
    State(state): State<AppState>,
    RequireRole(session, _): RequireRole<AdminOnly>,
) -> AppResult<Json<Vec<Profile>>> {
    Ok(Json(state.facade.list_profiles(&session).await?))
}

#[instrument(skip(state, session))]
pub async fn set_active(
    State(state): State<AppState>,
    RequireRole(session, _): RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActiveBody>,
) -> AppResult<Json<ActiveBody>> {
    let active = state.facade.set_user_active(&session, id, body.active).await?;
    Ok(Json(ActiveBody { active }))
}

#[instrument(skip(state, session))]
pub async fn set_role(
    State(state): State<AppState>,
    RequireRole(session, _): RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(body): Json<RoleBody>,
) -> AppResult<Json<RoleBody>> {
    let role = state.facade.set_user_role(&session, id, body.role).await?;
    Ok(Json(RoleBody { role }))
}
