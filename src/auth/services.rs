use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{AuthResponse, RegisterRequest};
use super::jwt::JwtKeys;
use super::password::{check_password_policy, hash_password, verify_password};
use crate::{
    error::{AppError, AppResult, AuthError, ValidationError},
    session::{Role, Session},
    state::AppState,
    store::types::{NewProfile, Profile},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Form checks run before anything reaches the store.
pub fn validate_registration(req: &RegisterRequest) -> Result<(), ValidationError> {
    if req.email.trim().is_empty() {
        return Err(ValidationError::Required("email"));
    }
    if !is_valid_email(&req.email) {
        return Err(ValidationError::InvalidEmail);
    }
    check_password_policy(&req.password)?;
    if req.role == Role::Admin {
        return Err(ValidationError::RoleNotSelectable(Role::Admin));
    }
    let has_company = req
        .company_name
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    if req.role == Role::Employer && !has_company {
        return Err(ValidationError::CompanyNameRequired);
    }
    Ok(())
}

/// Creates the account and its profile. An already registered e-mail is not
/// an error: the supplied password is tried as a login instead.
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn sign_up(state: &AppState, mut req: RegisterRequest) -> AppResult<AuthResponse> {
    req.email = normalize_email(&req.email);
    validate_registration(&req).inspect_err(|e| warn!(error = %e, "registration rejected"))?;

    if state.store.find_user_by_email(&req.email).await?.is_some() {
        info!("email already registered; attempting sign-in");
        return sign_in(state, &req.email, &req.password).await;
    }

    let hash = hash_password(&req.password)?;
    let user = state.store.insert_user(&req.email, &hash).await?;
    let company = match req.role {
        Role::Employer => req.company_name.unwrap_or_default().trim().to_string(),
        _ => String::new(),
    };
    let profile = state
        .store
        .insert_profile(NewProfile {
            id: user.id,
            email: user.email.clone(),
            role: req.role,
            company,
        })
        .await?;

    info!(user_id = %user.id, role = %profile.role, "user registered");
    Ok(JwtKeys::from_ref(state).issue(&profile)?)
}

#[instrument(skip(state, password))]
pub async fn sign_in(state: &AppState, email: &str, password: &str) -> AppResult<AuthResponse> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        warn!("invalid email");
        return Err(ValidationError::InvalidEmail.into());
    }

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!("login unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let profile = ensure_profile(state, user.id, &user.email).await?;
    info!(user_id = %user.id, "user logged in");
    Ok(JwtKeys::from_ref(state).issue(&profile)?)
}

/// Exchanges a refresh token for a new pair, re-reading the profile so role
/// or company changes show up in the new session.
#[instrument(skip(state, refresh_token))]
pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_refresh(refresh_token)?;
    let Some(user) = state.store.find_user(claims.sub).await? else {
        warn!(user_id = %claims.sub, "refresh for unknown user");
        return Err(AuthError::InvalidToken.into());
    };
    let profile = ensure_profile(state, user.id, &user.email).await?;
    Ok(keys.issue(&profile)?)
}

/// Returns the stored profile, creating a job-seeker profile when none exists.
pub(crate) async fn ensure_profile(
    state: &AppState,
    user_id: Uuid,
    email: &str,
) -> AppResult<Profile> {
    if let Some(profile) = state.store.find_profile(user_id).await? {
        return Ok(profile);
    }
    info!(user_id = %user_id, "creating missing profile");
    Ok(state
        .store
        .insert_profile(NewProfile {
            id: user_id,
            email: email.to_string(),
            role: Role::Jobseeker,
            company: String::new(),
        })
        .await?)
}

/// Session for a verified access token.
pub fn session_from_token(keys: &JwtKeys, token: &str) -> Result<Session, AppError> {
    Ok(keys.verify_access(token)?.into())
}
