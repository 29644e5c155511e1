use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::UPLOAD_LIMIT;
use crate::{
    auth::extractors::{AuthSession, EmployerOnly, EmployerOrAdmin, RequireRole},
    error::AppResult,
    facade::{JobFields, SubmitApplication, FEATURED_LIMIT},
    state::AppState,
    store::types::{Application, Job, JobPatch, JobStatus},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/featured", get(featured_jobs))
        .route("/jobs/:id", get(get_job).patch(update_job))
        .route("/jobs/:id/status", put(set_job_status))
        .route(
            "/jobs/:id/applications",
            post(submit_application).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/employer/jobs", get(employer_jobs))
        .route("/employer/applications", get(employer_applications))
        .route("/me/applications", get(my_applications))
}

#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusBody {
    pub status: JobStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplyBody {
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub attachment_base64: Option<String>,
    #[serde(default)]
    pub answers: Vec<String>,
}

pub async fn list_jobs(State(state): State<AppState>) -> AppResult<Json<Vec<Job>>> {
    Ok(Json(state.facade.list_jobs().await?))
}

pub async fn featured_jobs(
    State(state): State<AppState>,
    Query(q): Query<FeaturedQuery>,
) -> AppResult<Json<Vec<Job>>> {
    let limit = q.limit.unwrap_or(FEATURED_LIMIT);
    Ok(Json(state.facade.featured_jobs(limit).await?))
}

pub async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Job>> {
    Ok(Json(state.facade.get_job(id).await?))
}

#[instrument(skip(state, session, input))]
pub async fn create_job(
    State(state): State<AppState>,
    RequireRole(session, _): RequireRole<EmployerOrAdmin>,
    Json(input): Json<JobFields>,
) -> AppResult<(StatusCode, HeaderMap, Json<Job>)> {
    let job = state.facade.create_job(&session, input).await?;
    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/jobs/{}", job.id)) {
        headers.insert(LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(job)))
}

#[instrument(skip(state, session, patch))]
pub async fn update_job(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
    Json(patch): Json<JobPatch>,
) -> AppResult<Json<Job>> {
    Ok(Json(state.facade.update_job(&session, id, patch).await?))
}

#[instrument(skip(state, session))]
pub async fn set_job_status(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
    Json(body): Json<JobStatusBody>,
) -> AppResult<Json<JobStatusBody>> {
    let status = state.facade.set_job_status(&session, id, body.status).await?;
    Ok(Json(JobStatusBody { status }))
}

#[instrument(skip(state, session, body))]
pub async fn submit_application(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(job_id): Path<Uuid>,
    Json(body): Json<ApplyBody>,
) -> AppResult<(StatusCode, Json<Application>)> {
    let input = SubmitApplication {
        job_id,
        resume_text: body.resume_text,
        attachment_base64: body.attachment_base64,
        answers: body.answers,
    };
    let application = state.facade.submit_application(&session, input).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn employer_jobs(
    State(state): State<AppState>,
    RequireRole(session, _): RequireRole<EmployerOnly>,
) -> AppResult<Json<Vec<Job>>> {
    Ok(Json(state.facade.list_employer_jobs(session.user_id).await?))
}

pub async fn employer_applications(
    State(state): State<AppState>,
    RequireRole(session, _): RequireRole<EmployerOnly>,
) -> AppResult<Json<Vec<Application>>> {
    Ok(Json(
        state
            .facade
            .list_applications_for_employer(session.user_id)
            .await?,
    ))
}

pub async fn my_applications(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> AppResult<Json<Vec<Application>>> {
    Ok(Json(
        state
            .facade
            .list_applications_for_applicant(session.user_id)
            .await?,
    ))
}
