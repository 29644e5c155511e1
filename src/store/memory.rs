//! In-process store used by unit tests and `AppState::fake()`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::{
    Application, ApplicationFilter, ApplicationStatus, Job, JobFilter, JobPatch, NewApplication,
    NewJob, NewProfile, Profile, ProfilePatch, UserRecord,
};
use super::{Store, StoreResult};
use crate::error::StoreError;
use crate::session::{Role, Session};

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    profiles: Vec<Profile>,
    jobs: Vec<Job>,
    applications: Vec<Application>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failures: Mutex<HashMap<&'static str, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call to `op` fail with `message`.
    pub fn fail(&self, op: &'static str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(op, message.to_string());
    }

    /// Creates a user with a profile and returns a session for it.
    pub fn seed_account(&self, email: &str, role: Role, company: &str) -> Session {
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();
        let mut t = self.tables();
        t.users.push(UserRecord {
            id,
            email: email.to_string(),
            password_hash: String::new(),
            created_at: now,
        });
        t.profiles.push(Profile {
            id,
            email: email.to_string(),
            role,
            full_name: String::new(),
            company: company.to_string(),
            bio: String::new(),
            is_active: true,
            cv_key: None,
            created_at: now,
        });
        Session {
            user_id: id,
            email: email.to_string(),
            roles: role.into(),
            company_name: (!company.is_empty()).then(|| company.to_string()),
            issued_at: now.unix_timestamp(),
        }
    }

    pub fn remove_job(&self, id: Uuid) {
        self.tables().jobs.retain(|j| j.id != id);
    }

    pub fn remove_profile(&self, id: Uuid) {
        self.tables().profiles.retain(|p| p.id != id);
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    fn check(&self, op: &'static str) -> StoreResult<()> {
        match self.failures.lock().unwrap().get(op) {
            Some(message) => Err(StoreError::new(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        self.check("find_user_by_email")?;
        Ok(self.tables().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        self.check("find_user")?;
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, email: &str, password_hash: &str) -> StoreResult<UserRecord> {
        self.check("insert_user")?;
        let mut t = self.tables();
        if t.users.iter().any(|u| u.email == email) {
            return Err(StoreError::new(
                "duplicate key value violates unique constraint \"users_email_key\"",
            ));
        }
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        self.check("find_profile")?;
        Ok(self.tables().profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<Profile> {
        self.check("insert_profile")?;
        let mut t = self.tables();
        if let Some(existing) = t.profiles.iter().find(|p| p.id == profile.id) {
            return Ok(existing.clone());
        }
        let row = Profile {
            id: profile.id,
            email: profile.email,
            role: profile.role,
            full_name: String::new(),
            company: profile.company,
            bio: String::new(),
            is_active: true,
            cv_key: None,
            created_at: OffsetDateTime::now_utc(),
        };
        t.profiles.push(row.clone());
        Ok(row)
    }

    async fn list_profiles(&self, ids: Option<&[Uuid]>) -> StoreResult<Vec<Profile>> {
        self.check("list_profiles")?;
        Ok(self
            .tables()
            .profiles
            .iter()
            .rev()
            .filter(|p| ids.map_or(true, |ids| ids.contains(&p.id)))
            .cloned()
            .collect())
    }

    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> StoreResult<Option<Profile>> {
        self.check("update_profile")?;
        let mut t = self.tables();
        let Some(p) = t.profiles.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(v) = patch.full_name {
            p.full_name = v;
        }
        if let Some(v) = patch.company {
            p.company = v;
        }
        if let Some(v) = patch.bio {
            p.bio = v;
        }
        if let Some(v) = patch.is_active {
            p.is_active = v;
        }
        if let Some(v) = patch.role {
            p.role = v;
        }
        if let Some(v) = patch.cv_key {
            p.cv_key = Some(v);
        }
        Ok(Some(p.clone()))
    }

    async fn list_jobs(&self, filter: &JobFilter) -> StoreResult<Vec<Job>> {
        self.check("list_jobs")?;
        // insertion order is creation order, so reversing gives newest first
        let mut jobs: Vec<Job> = self
            .tables()
            .jobs
            .iter()
            .rev()
            .filter(|j| filter.employer_id.map_or(true, |e| j.employer_id == e))
            .filter(|j| filter.status.map_or(true, |s| j.status == s))
            .cloned()
            .collect();
        if filter.featured_first {
            jobs.sort_by_key(|j| !j.featured);
        }
        if let Some(limit) = filter.limit {
            jobs.truncate(limit.max(0) as usize);
        }
        Ok(jobs)
    }

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        self.check("find_job")?;
        Ok(self.tables().jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn insert_job(&self, job: NewJob) -> StoreResult<Job> {
        self.check("insert_job")?;
        let mut t = self.tables();
        if !t.users.iter().any(|u| u.id == job.employer_id) {
            return Err(StoreError::new(
                "insert or update on table \"jobs\" violates foreign key constraint \"jobs_employer_id_fkey\"",
            ));
        }
        let row = Job {
            id: Uuid::new_v4(),
            employer_id: job.employer_id,
            title: job.title,
            description: job.description,
            location: job.location,
            salary: job.salary,
            job_type: job.job_type,
            company: job.company,
            apply_url: job.apply_url,
            expires_at: job.expires_at,
            additional_questions: job.additional_questions,
            status: Default::default(),
            featured: job.featured,
            created_at: OffsetDateTime::now_utc(),
        };
        t.jobs.push(row.clone());
        Ok(row)
    }

    async fn update_job(&self, id: Uuid, patch: JobPatch) -> StoreResult<Option<Job>> {
        self.check("update_job")?;
        let mut t = self.tables();
        let Some(j) = t.jobs.iter_mut().find(|j| j.id == id) else {
            return Ok(None);
        };
        if let Some(v) = patch.title {
            j.title = v;
        }
        if let Some(v) = patch.description {
            j.description = v;
        }
        if let Some(v) = patch.location {
            j.location = v;
        }
        if let Some(v) = patch.salary {
            j.salary = v;
        }
        if let Some(v) = patch.job_type {
            j.job_type = v;
        }
        if let Some(v) = patch.company {
            j.company = v;
        }
        if let Some(v) = patch.apply_url {
            j.apply_url = v;
        }
        if let Some(v) = patch.expires_at {
            j.expires_at = v;
        }
        if let Some(v) = patch.additional_questions {
            j.additional_questions = v;
        }
        if let Some(v) = patch.status {
            j.status = v;
        }
        if let Some(v) = patch.featured {
            j.featured = v;
        }
        Ok(Some(j.clone()))
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> StoreResult<Vec<Application>> {
        self.check("list_applications")?;
        Ok(self
            .tables()
            .applications
            .iter()
            .rev()
            .filter(|a| filter.applicant_id.map_or(true, |id| a.applicant_id == id))
            .filter(|a| {
                filter
                    .job_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&a.job_id))
            })
            .cloned()
            .collect())
    }

    async fn find_application(&self, id: Uuid) -> StoreResult<Option<Application>> {
        self.check("find_application")?;
        Ok(self.tables().applications.iter().find(|a| a.id == id).cloned())
    }

    async fn insert_application(&self, application: NewApplication) -> StoreResult<Application> {
        self.check("insert_application")?;
        let mut t = self.tables();
        if !t.jobs.iter().any(|j| j.id == application.job_id) {
            return Err(StoreError::new(
                "insert or update on table \"applications\" violates foreign key constraint \"applications_job_id_fkey\"",
            ));
        }
        let row = Application {
            id: Uuid::new_v4(),
            job_id: application.job_id,
            applicant_id: application.applicant_id,
            resume_text: application.resume_text,
            attachment_key: application.attachment_key,
            answers: application.answers,
            status: ApplicationStatus::Submitted,
            created_at: OffsetDateTime::now_utc(),
        };
        t.applications.push(row.clone());
        Ok(row)
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> StoreResult<Option<Application>> {
        self.check("update_application_status")?;
        let mut t = self.tables();
        let Some(a) = t
            .applications
            .iter_mut()
            .find(|a| a.id == id && a.status.can_become(status))
        else {
            return Ok(None);
        };
        a.status = status;
        Ok(Some(a.clone()))
    }
}
