use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::session::Role;
use crate::store::types::ApplicationStatus;

/// Failure reported by the backing store. The message is the backend's own
/// text and is shown to the user unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) => Self::new(db.message()),
            other => Self::new(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing Authorization header")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Access token required")]
    WrongTokenKind,
    #[error("Account disabled. Contact admin.")]
    AccountDisabled,
    #[error("Invalid API key")]
    InvalidApiKey,
    /// Message reported by the auth endpoint (client side) or transport failure.
    #[error("{0}")]
    Provider(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Invalid email")]
    InvalidEmail,
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("Company name is required for employer accounts")]
    CompanyNameRequired,
    #[error("Cannot register as {0}")]
    RoleNotSelectable(Role),
    #[error("Cannot change application status from {from} to {to}")]
    StatusTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("Job is not accepting applications")]
    JobClosed,
    #[error("Too many answers: job has {0} additional questions")]
    TooManyAnswers(usize),
    #[error("Attachment is not valid base64")]
    InvalidAttachment,
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Sign in required")]
    LoginRequired { from: String },
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Unavailable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::AccountDisabled) => StatusCode::FORBIDDEN,
            AppError::Auth(_) | AppError::LoginRequired { .. } => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        }
        let body = match &self {
            AppError::LoginRequired { from } => json!({
                "error": self.to_string(),
                "redirect": crate::session::gate::LOGIN_PATH,
                "from": from,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
