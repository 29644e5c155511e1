use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthSession,
    error::{AppError, AppResult, ValidationError},
    facade::sanitize::strip_tags,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/optimize", post(optimize))
}

/// Either `job_id` or an explicit `job_description` supplies the target role.
#[derive(Debug, Deserialize)]
pub struct OptimizeBody {
    pub resume: String,
    #[serde(default)]
    pub job_id: Option<Uuid>,
    #[serde(default)]
    pub job_description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OptimizedResume {
    pub optimized_resume: String,
}

#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn optimize(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(body): Json<OptimizeBody>,
) -> AppResult<Json<OptimizedResume>> {
    let Some(optimizer) = state.optimizer.as_ref() else {
        return Err(AppError::Unavailable(
            "Resume optimizer is not configured".into(),
        ));
    };
    if body.resume.trim().is_empty() {
        return Err(ValidationError::Required("resume").into());
    }
    let job_description = match (body.job_description, body.job_id) {
        (Some(text), _) if !text.trim().is_empty() => text,
        (_, Some(job_id)) => strip_tags(&state.facade.get_job(job_id).await?.description),
        _ => return Err(ValidationError::Required("job_description").into()),
    };
    let optimized_resume = optimizer.optimize(&body.resume, &job_description).await?;
    Ok(Json(OptimizedResume { optimized_resume }))
}
