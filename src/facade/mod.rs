//! Data access façade. Every read and write the application performs goes
//! through [`Facade`]; operations that depend on who is asking take the
//! caller's [`Session`] explicitly.

use std::sync::Arc;

use base64ct::{Base64, Encoding};
use tracing::warn;

use crate::{
    error::{AppError, AppResult, AuthError, ValidationError},
    session::{Role, Session},
    storage::StorageClient,
    store::{types::Profile, Store},
};

mod applications;
mod jobs;
mod profiles;
pub mod sanitize;

pub use applications::SubmitApplication;
pub use jobs::{JobFields, FEATURED_LIMIT};
pub use profiles::{ProfileUpdate, ProfileView};

/// Company shown on a posting when neither the profile nor the session has one.
pub const DEFAULT_COMPANY: &str = "Our Company";

#[derive(Clone)]
pub struct Facade {
    store: Arc<dyn Store>,
    storage: Arc<dyn StorageClient>,
}

impl Facade {
    pub fn new(store: Arc<dyn Store>, storage: Arc<dyn StorageClient>) -> Self {
        Self { store, storage }
    }

    /// Admin rights need both the token claim and the stored profile, so a
    /// demoted or disabled admin loses them before the token expires.
    async fn require_admin(&self, session: &Session) -> AppResult<Profile> {
        if !session.is_admin() {
            return Err(AppError::Forbidden("Admin access required".into()));
        }
        let profile = self.active_profile(session).await?;
        if profile.role != Role::Admin {
            warn!(user_id = %session.user_id, role = %profile.role, "stale admin token");
            return Err(AppError::Forbidden("Admin access required".into()));
        }
        Ok(profile)
    }

    /// True when the caller's token and active profile both say admin.
    fn acts_as_admin(session: &Session, profile: &Profile) -> bool {
        session.is_admin() && profile.role == Role::Admin
    }

    /// The caller's stored profile, refusing disabled accounts.
    async fn active_profile(&self, session: &Session) -> AppResult<Profile> {
        let profile = self
            .store
            .find_profile(session.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;
        if !profile.is_active {
            warn!(user_id = %session.user_id, "disabled account attempted a write");
            return Err(AuthError::AccountDisabled.into());
        }
        Ok(profile)
    }

    /// Employer or admin with an active account.
    async fn active_manager(&self, session: &Session) -> AppResult<Profile> {
        if !session.has_role(Role::Employer) && !session.is_admin() {
            return Err(AppError::Forbidden(
                "Employer or Admin access required".into(),
            ));
        }
        self.active_profile(session).await
    }

    /// Removes an uploaded object after a failed write. Failures are logged only.
    async fn discard_object(&self, key: &str) {
        if let Err(e) = self.storage.delete_object(key).await {
            warn!(error = %e, key, "failed to remove orphaned object");
        }
    }
}

/// Decodes an upload given as plain base64 or as a `data:` URL.
pub(crate) fn decode_base64(input: &str) -> Result<Vec<u8>, ValidationError> {
    let payload = match input.trim().split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => input,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    match Base64::decode_vec(&compact) {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(ValidationError::InvalidAttachment),
    }
}
