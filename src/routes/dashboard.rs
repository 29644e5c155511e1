use axum::{extract::State, routing::get, Json, Router};

use crate::{
    auth::extractors::{AdminOnly, EmployerOnly, JobSeekerOnly, RequireRole},
    dashboard::{admin::AdminDashboard, employer::EmployerDashboard, seeker::SeekerDashboard},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/seeker", get(seeker))
        .route("/dashboard/employer", get(employer))
        .route("/dashboard/admin", get(admin))
}

// Dashboards report failed sections in the body, so these always answer 200
// once the role gate has passed.

pub async fn seeker(
    State(state): State<AppState>,
    RequireRole(session, _): RequireRole<JobSeekerOnly>,
) -> Json<SeekerDashboard> {
    Json(SeekerDashboard::load(&state.facade, &session).await)
}

pub async fn employer(
    State(state): State<AppState>,
    RequireRole(session, _): RequireRole<EmployerOnly>,
) -> Json<EmployerDashboard> {
    Json(EmployerDashboard::load(&state.facade, &session).await)
}

pub async fn admin(
    State(state): State<AppState>,
    RequireRole(session, _): RequireRole<AdminOnly>,
) -> Json<AdminDashboard> {
    Json(AdminDashboard::load(&state.facade, &session).await)
}
