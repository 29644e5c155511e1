use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;
use crate::session::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Active,
    Pending,
    Archived,
    Rejected,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Pending => "pending",
            JobStatus::Archived => "archived",
            JobStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for JobStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(JobStatus::Active),
            "pending" => Ok(JobStatus::Pending),
            "archived" => Ok(JobStatus::Archived),
            "rejected" => Ok(JobStatus::Rejected),
            other => Err(StoreError::new(format!("unknown job status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[default]
    Submitted,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "Submitted",
            ApplicationStatus::Accepted => "Accepted",
            ApplicationStatus::Rejected => "Rejected",
        }
    }

    /// Only a submitted application can be decided. Re-applying the current
    /// status is allowed and changes nothing.
    pub fn can_become(self, next: ApplicationStatus) -> bool {
        self == next
            || matches!(
                (self, next),
                (
                    ApplicationStatus::Submitted,
                    ApplicationStatus::Accepted | ApplicationStatus::Rejected
                )
            )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Submitted" => Ok(ApplicationStatus::Submitted),
            "Accepted" => Ok(ApplicationStatus::Accepted),
            "Rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(StoreError::new(format!(
                "unknown application status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub full_name: String,
    pub company: String,
    pub bio: String,
    pub is_active: bool,
    pub cv_key: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub company: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub company: Option<String>,
    pub bio: Option<String>,
    pub is_active: Option<bool>,
    pub role: Option<Role>,
    pub cv_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub employer_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub company: String,
    pub apply_url: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    pub additional_questions: Vec<String>,
    pub status: JobStatus,
    pub featured: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Job {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.employer_id == user_id
    }

    /// Active and not past its expiry.
    pub fn is_open(&self, now: OffsetDateTime) -> bool {
        self.status == JobStatus::Active && self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub employer_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary: String,
    pub job_type: String,
    pub company: String,
    pub apply_url: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
    pub additional_questions: Vec<String>,
    pub featured: bool,
}

/// Partial job update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub company: Option<String>,
    /// `Some(None)` clears the link.
    #[serde(default, deserialize_with = "present")]
    pub apply_url: Option<Option<String>>,
    /// `Some(None)` removes the expiry.
    #[serde(default, deserialize_with = "present_rfc3339")]
    pub expires_at: Option<Option<OffsetDateTime>>,
    pub additional_questions: Option<Vec<String>>,
    pub status: Option<JobStatus>,
    pub featured: Option<bool>,
}

/// A field that appears in the body, even as `null`, becomes `Some`.
fn present<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

fn present_rfc3339<'de, D>(de: D) -> Result<Option<Option<OffsetDateTime>>, D::Error>
where
    D: Deserializer<'de>,
{
    time::serde::rfc3339::option::deserialize(de).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub resume_text: String,
    pub attachment_key: Option<String>,
    pub answers: Vec<String>,
    pub status: ApplicationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub resume_text: String,
    pub attachment_key: Option<String>,
    pub answers: Vec<String>,
}

/// Job selection. Results are always newest first; `featured_first` puts
/// featured jobs ahead of the rest.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub employer_id: Option<Uuid>,
    pub status: Option<JobStatus>,
    pub featured_first: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub applicant_id: Option<Uuid>,
    pub job_ids: Option<Vec<Uuid>>,
}
