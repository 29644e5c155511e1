use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
    extractors::AuthSession,
    services,
};
use crate::{error::AppResult, session::Session, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(services::sign_up(&state, payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(
        services::sign_in(&state, &payload.email, &payload.password).await?,
    ))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(services::refresh(&state, &payload.refresh_token).await?))
}

/// Tokens are stateless; signing out only ends the client's session.
#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn logout(AuthSession(session): AuthSession) -> StatusCode {
    info!("user signed out");
    StatusCode::NO_CONTENT
}

pub async fn session(AuthSession(session): AuthSession) -> Json<Session> {
    Json(session)
}
