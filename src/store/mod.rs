//! The relational store behind the façade. Everything the application reads
//! or writes goes through [`Store`]; the PostgreSQL implementation lives in
//! [`postgres`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod types;

use types::{
    Application, ApplicationFilter, ApplicationStatus, Job, JobFilter, JobPatch, NewApplication,
    NewJob, NewProfile, Profile, ProfilePatch, UserRecord,
};

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;
    async fn insert_user(&self, email: &str, password_hash: &str) -> StoreResult<UserRecord>;

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;
    /// Inserts a profile, or returns the existing one for the same id.
    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<Profile>;
    /// All profiles when `ids` is `None`, newest first.
    async fn list_profiles(&self, ids: Option<&[Uuid]>) -> StoreResult<Vec<Profile>>;
    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> StoreResult<Option<Profile>>;

    async fn list_jobs(&self, filter: &JobFilter) -> StoreResult<Vec<Job>>;
    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>>;
    async fn insert_job(&self, job: NewJob) -> StoreResult<Job>;
    async fn update_job(&self, id: Uuid, patch: JobPatch) -> StoreResult<Option<Job>>;

    async fn list_applications(&self, filter: &ApplicationFilter)
        -> StoreResult<Vec<Application>>;
    async fn find_application(&self, id: Uuid) -> StoreResult<Option<Application>>;
    async fn insert_application(&self, application: NewApplication) -> StoreResult<Application>;
    /// Writes `status` only while the stored status still allows it (see
    /// [`ApplicationStatus::can_become`]). `None` when the row is missing or
    /// was decided differently in the meantime.
    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> StoreResult<Option<Application>>;
}
