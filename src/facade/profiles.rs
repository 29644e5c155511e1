use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{decode_base64, sanitize::strip_tags, Facade};
use crate::{
    error::{AppError, AppResult, ValidationError},
    session::{Role, Session},
    storage::{cv_key, sniff_content_type, PRESIGN_TTL_SECS},
    store::types::{NewProfile, Profile, ProfilePatch},
};

/// Fields a user may edit on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub company: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: Profile,
    pub cv_url: Option<String>,
}

impl Facade {
    /// Returns the caller's profile, creating it from the session when the
    /// account has none yet.
    pub async fn get_or_create_profile(&self, session: &Session) -> AppResult<Profile> {
        if let Some(profile) = self.store.find_profile(session.user_id).await? {
            return Ok(profile);
        }
        let role = session.roles.iter().max().unwrap_or(Role::Jobseeker);
        info!(user_id = %session.user_id, %role, "creating profile on first view");
        Ok(self
            .store
            .insert_profile(NewProfile {
                id: session.user_id,
                email: session.email.clone(),
                role,
                company: session.company_name.clone().unwrap_or_default(),
            })
            .await?)
    }

    pub async fn profile_view(&self, session: &Session) -> AppResult<ProfileView> {
        let profile = self.get_or_create_profile(session).await?;
        self.with_cv_url(profile).await
    }

    async fn with_cv_url(&self, profile: Profile) -> AppResult<ProfileView> {
        let cv_url = match &profile.cv_key {
            Some(key) => Some(self.storage.presign_get(key, PRESIGN_TTL_SECS).await?),
            None => None,
        };
        Ok(ProfileView { profile, cv_url })
    }

    #[instrument(skip(self, session, update), fields(user_id = %session.user_id))]
    pub async fn update_profile(
        &self,
        session: &Session,
        update: ProfileUpdate,
    ) -> AppResult<Profile> {
        self.get_or_create_profile(session).await?;
        let patch = ProfilePatch {
            full_name: update.full_name.as_deref().map(strip_tags),
            company: update.company.as_deref().map(strip_tags),
            bio: update.bio.as_deref().map(strip_tags),
            ..ProfilePatch::default()
        };
        let profile = self
            .store
            .update_profile(session.user_id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;
        info!("profile updated");
        Ok(profile)
    }

    /// Stores a new CV and points the profile at it. The previous file is
    /// removed once the profile row no longer references it.
    #[instrument(skip(self, session, cv_base64), fields(user_id = %session.user_id))]
    pub async fn upload_cv(&self, session: &Session, cv_base64: &str) -> AppResult<ProfileView> {
        let previous = self.get_or_create_profile(session).await?.cv_key;
        let body = decode_base64(cv_base64)?;
        let content_type = sniff_content_type(&body);
        let key = cv_key(session.user_id, content_type);
        self.storage
            .put_object(&key, Bytes::from(body), content_type)
            .await
            .map_err(|e| {
                error!(error = %e, "cv upload failed");
                AppError::Internal(e.context("store cv"))
            })?;

        let patch = ProfilePatch {
            cv_key: Some(key.clone()),
            ..ProfilePatch::default()
        };
        let profile = match self.store.update_profile(session.user_id, patch).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                self.discard_object(&key).await;
                return Err(AppError::NotFound("Profile not found".into()));
            }
            Err(e) => {
                self.discard_object(&key).await;
                return Err(e.into());
            }
        };
        if let Some(old) = previous.filter(|old| *old != key) {
            self.discard_object(&old).await;
        }
        info!(cv_key = %key, "cv uploaded");
        self.with_cv_url(profile).await
    }

    pub async fn list_profiles(&self, session: &Session) -> AppResult<Vec<Profile>> {
        self.require_admin(session).await?;
        Ok(self.store.list_profiles(None).await?)
    }

    /// Profiles for the given ids; ids without a profile are simply absent.
    pub async fn profiles_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.list_profiles(Some(ids)).await?)
    }

    /// Enables or disables an account. Setting the current value again
    /// succeeds and changes nothing.
    #[instrument(skip(self, session), fields(admin_id = %session.user_id))]
    pub async fn set_user_active(
        &self,
        session: &Session,
        user_id: Uuid,
        active: bool,
    ) -> AppResult<bool> {
        self.require_admin(session).await?;
        if user_id == session.user_id && !active {
            warn!("admin tried to disable own account");
            return Err(ValidationError::Invalid("Admins cannot disable their own account".into()).into());
        }
        let patch = ProfilePatch {
            is_active: Some(active),
            ..ProfilePatch::default()
        };
        let profile = self
            .store
            .update_profile(user_id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        info!(%user_id, active = profile.is_active, "user status changed");
        Ok(profile.is_active)
    }

    #[instrument(skip(self, session), fields(admin_id = %session.user_id))]
    pub async fn set_user_role(&self, session: &Session, user_id: Uuid, role: Role) -> AppResult<Role> {
        self.require_admin(session).await?;
        if user_id == session.user_id {
            return Err(ValidationError::Invalid("Admins cannot change their own role".into()).into());
        }
        let patch = ProfilePatch {
            role: Some(role),
            ..ProfilePatch::default()
        };
        let profile = self
            .store
            .update_profile(user_id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        info!(%user_id, role = %profile.role, "user role changed");
        Ok(profile.role)
    }
}
