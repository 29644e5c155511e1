use std::marker::PhantomData;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::{
    error::{AppError, AuthError},
    session::{gate::GateDecision, gate::RoleGate, Role, Session, SessionState},
};

fn bearer(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header.to_str().map_err(|_| AuthError::InvalidToken)?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(Some)
        .ok_or(AuthError::InvalidToken)
}

fn session_state<S>(parts: &Parts, state: &S) -> Result<SessionState, AuthError>
where
    JwtKeys: FromRef<S>,
{
    let Some(token) = bearer(parts)? else {
        return Ok(SessionState::ready(None));
    };
    let claims = JwtKeys::from_ref(state).verify_access(token).map_err(|e| {
        warn!(error = %e, "rejected bearer token");
        e
    })?;
    Ok(SessionState::ready(Some(claims.into())))
}

/// The signed-in session behind a valid access token.
pub struct AuthSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match session_state(parts, state)?.session {
            Some(session) => Ok(AuthSession(session)),
            None => Err(AuthError::MissingToken.into()),
        }
    }
}

/// Session state for routes that also serve anonymous callers. A present but
/// invalid token is still rejected.
pub struct CurrentSession(pub SessionState);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentSession(session_state(parts, state)?))
    }
}

/// Role set a [`RequireRole`] extractor admits.
pub trait AllowedRoles: Send + Sync + 'static {
    const ROLES: &'static [Role];
    const DENIED: &'static str;
}

pub struct EmployerOnly;
pub struct JobSeekerOnly;
pub struct AdminOnly;
pub struct EmployerOrAdmin;

impl AllowedRoles for EmployerOnly {
    const ROLES: &'static [Role] = &[Role::Employer];
    const DENIED: &'static str = "Employer access required";
}

impl AllowedRoles for JobSeekerOnly {
    const ROLES: &'static [Role] = &[Role::Jobseeker];
    const DENIED: &'static str = "Jobseeker access required";
}

impl AllowedRoles for AdminOnly {
    const ROLES: &'static [Role] = &[Role::Admin];
    const DENIED: &'static str = "Admin access required";
}

impl AllowedRoles for EmployerOrAdmin {
    const ROLES: &'static [Role] = &[Role::Employer, Role::Admin];
    const DENIED: &'static str = "Employer or Admin access required";
}

/// Runs the role gate for the request path. Anonymous callers get a login
/// redirect carrying the path; signed-in callers outside `R` get `403`.
pub struct RequireRole<R: AllowedRoles>(pub Session, pub PhantomData<R>);

#[async_trait]
impl<S, R> FromRequestParts<S> for RequireRole<R>
where
    S: Send + Sync,
    R: AllowedRoles,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let requested = parts
            .extensions
            .get::<OriginalUri>()
            .map(|uri| uri.path().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        let current = session_state(parts, state)?;

        match RoleGate::new(R::ROLES.iter().copied()).check(&current, &requested) {
            GateDecision::Render => match current.session {
                Some(session) => Ok(RequireRole(session, PhantomData)),
                None => Err(AuthError::MissingToken.into()),
            },
            GateDecision::RedirectToLogin { from } => Err(AppError::LoginRequired { from }),
            GateDecision::RedirectHome | GateDecision::Pending => {
                warn!(path = %requested, "role gate denied request");
                Err(AppError::Forbidden(R::DENIED.to_string()))
            }
        }
    }
}
