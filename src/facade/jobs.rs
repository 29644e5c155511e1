use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    sanitize::{clean_description, strip_tags},
    Facade, DEFAULT_COMPANY,
};
use crate::{
    error::{AppError, AppResult, ValidationError},
    session::Session,
    store::types::{Job, JobFilter, JobPatch, JobStatus, NewJob},
};

/// Number of postings on the home page.
pub const FEATURED_LIMIT: i64 = 8;

/// Fields an employer supplies when posting. Owner and company are taken
/// from the caller, never from the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFields {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub salary: String,
    #[serde(rename = "type", default)]
    pub job_type: String,
    #[serde(default)]
    pub apply_url: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub additional_questions: Vec<String>,
}

impl JobFields {
    #[cfg(test)]
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.into(),
            description: format!("<p>{title} wanted</p>"),
            job_type: "full-time".into(),
            ..Self::default()
        }
    }
}

fn clean_questions(questions: Vec<String>) -> Vec<String> {
    questions
        .iter()
        .map(|q| strip_tags(q))
        .filter(|q| !q.is_empty())
        .collect()
}

fn clean_patch(mut patch: JobPatch) -> JobPatch {
    patch.title = patch.title.as_deref().map(strip_tags);
    patch.description = patch.description.as_deref().map(clean_description);
    patch.location = patch.location.as_deref().map(strip_tags);
    patch.salary = patch.salary.as_deref().map(strip_tags);
    patch.job_type = patch.job_type.as_deref().map(strip_tags);
    patch.company = patch.company.as_deref().map(strip_tags);
    patch.apply_url = patch
        .apply_url
        .map(|url| url.filter(|u| !u.trim().is_empty()));
    patch.additional_questions = patch.additional_questions.map(clean_questions);
    patch
}

impl Facade {
    /// All jobs, newest first.
    pub async fn list_jobs(&self) -> AppResult<Vec<Job>> {
        Ok(self.store.list_jobs(&JobFilter::default()).await?)
    }

    /// Active jobs for the home page, featured ones first.
    pub async fn featured_jobs(&self, limit: i64) -> AppResult<Vec<Job>> {
        let filter = JobFilter {
            status: Some(JobStatus::Active),
            featured_first: true,
            limit: Some(limit.clamp(1, 100)),
            ..JobFilter::default()
        };
        Ok(self.store.list_jobs(&filter).await?)
    }

    pub async fn get_job(&self, id: Uuid) -> AppResult<Job> {
        self.store
            .find_job(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Job not found".into()))
    }

    pub async fn list_employer_jobs(&self, employer_id: Uuid) -> AppResult<Vec<Job>> {
        let filter = JobFilter {
            employer_id: Some(employer_id),
            ..JobFilter::default()
        };
        Ok(self.store.list_jobs(&filter).await?)
    }

    #[instrument(skip(self, session, input), fields(user_id = %session.user_id))]
    pub async fn create_job(&self, session: &Session, input: JobFields) -> AppResult<Job> {
        let profile = self.active_manager(session).await?;

        let title = strip_tags(&input.title);
        let description = clean_description(&input.description);
        if title.is_empty() {
            warn!("job without title");
            return Err(ValidationError::Required("title").into());
        }
        if strip_tags(&description).is_empty() {
            warn!("job without description");
            return Err(ValidationError::Required("description").into());
        }

        let company = [Some(profile.company.as_str()), session.company_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COMPANY)
            .to_string();

        let job = self
            .store
            .insert_job(NewJob {
                employer_id: session.user_id,
                title,
                description,
                location: strip_tags(&input.location),
                salary: strip_tags(&input.salary),
                job_type: strip_tags(&input.job_type),
                company,
                apply_url: input.apply_url.filter(|u| !u.trim().is_empty()),
                expires_at: input.expires_at,
                additional_questions: clean_questions(input.additional_questions),
                featured: false,
            })
            .await?;
        info!(job_id = %job.id, "job created");
        Ok(job)
    }

    /// Edits a posting. Owners may change content and status. Featuring,
    /// rejecting, renaming the company and reviving a rejected posting are
    /// reserved for admins.
    #[instrument(skip(self, session, patch), fields(user_id = %session.user_id))]
    pub async fn update_job(&self, session: &Session, id: Uuid, patch: JobPatch) -> AppResult<Job> {
        let job = self.get_job(id).await?;
        let profile = self.active_profile(session).await?;
        if !Self::acts_as_admin(session, &profile) {
            if !job.is_owned_by(session.user_id) {
                return Err(AppError::Forbidden("Not the owner of this job".into()));
            }
            if patch.featured.is_some() || patch.status == Some(JobStatus::Rejected) {
                return Err(AppError::Forbidden("Admin access required".into()));
            }
            if patch.company.is_some() {
                warn!(job_id = %id, "owner tried to change company");
                return Err(AppError::Forbidden(
                    "Company is taken from the employer profile".into(),
                ));
            }
            if job.status == JobStatus::Rejected && patch.status.is_some() {
                warn!(job_id = %id, "owner tried to change a rejected job's status");
                return Err(AppError::Forbidden(
                    "Rejected jobs can only be changed by an admin".into(),
                ));
            }
        }

        let patch = clean_patch(patch);
        if patch.title.as_deref() == Some("") {
            return Err(ValidationError::Required("title").into());
        }
        let updated = self
            .store
            .update_job(id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound("Job not found".into()))?;
        info!(job_id = %id, "job updated");
        Ok(updated)
    }

    pub async fn set_job_status(
        &self,
        session: &Session,
        id: Uuid,
        status: JobStatus,
    ) -> AppResult<JobStatus> {
        let patch = JobPatch {
            status: Some(status),
            ..JobPatch::default()
        };
        Ok(self.update_job(session, id, patch).await?.status)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::error::AuthError;
    use crate::facade::fixture::Fixture;
    use crate::store::types::ProfilePatch;
    use crate::store::Store;

    #[tokio::test]
    async fn employer_listing_partitions_all_jobs() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let globex = fx.employer("hr@globex.test", "Globex");
        for title in ["Rust dev", "SRE"] {
            fx.post_job(&acme, title).await;
        }
        fx.post_job(&globex, "Designer").await;

        let all = fx.facade.list_jobs().await.expect("all");
        let mut union = HashSet::new();
        for employer in [&acme, &globex] {
            let own = fx.facade.list_employer_jobs(employer.user_id).await.expect("own");
            assert!(own.iter().all(|j| j.employer_id == employer.user_id));
            union.extend(own.into_iter().map(|j| j.id));
        }
        assert_eq!(union, all.iter().map(|j| j.id).collect::<HashSet<_>>());
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title, "Designer", "newest first");
    }

    #[tokio::test]
    async fn create_job_takes_owner_and_company_from_caller() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let job = fx
            .facade
            .create_job(
                &acme,
                JobFields {
                    title: "<b>Backend</b> engineer".into(),
                    description: "<p onclick=x>Ship it</p><script>bad()</script>".into(),
                    additional_questions: vec!["Why us?".into(), "  ".into()],
                    ..JobFields::default()
                },
            )
            .await
            .expect("create");
        assert_eq!(job.employer_id, acme.user_id);
        assert_eq!(job.company, "Acme");
        assert_eq!(job.title, "Backend engineer");
        assert_eq!(job.description, "<p>Ship it</p>bad()");
        assert_eq!(job.additional_questions, vec!["Why us?".to_string()]);
        assert_eq!(job.status, JobStatus::Active);
    }

    #[tokio::test]
    async fn company_falls_back_to_session_then_default() {
        let fx = Fixture::new();
        let mut anon = fx.employer("solo@x.test", "");
        assert_eq!(fx.post_job(&anon, "Any").await.company, DEFAULT_COMPANY);

        anon.company_name = Some("From Token".into());
        assert_eq!(fx.post_job(&anon, "Other").await.company, "From Token");
    }

    #[tokio::test]
    async fn create_job_validation_and_access() {
        let fx = Fixture::new();
        let seeker = fx.seeker("me@x.test");
        let err = fx
            .facade
            .create_job(&seeker, JobFields::titled("Nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let acme = fx.employer("hr@acme.test", "Acme");
        let err = fx
            .facade
            .create_job(&acme, JobFields { title: "<i></i>".into(), ..JobFields::titled("x") })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::Required("title"))));

        fx.store
            .update_profile(
                acme.user_id,
                ProfilePatch {
                    is_active: Some(false),
                    ..ProfilePatch::default()
                },
            )
            .await
            .expect("disable");
        let err = fx
            .facade
            .create_job(&acme, JobFields::titled("Blocked"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::AccountDisabled)));
    }

    #[tokio::test]
    async fn only_owner_or_admin_changes_job_status() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let rival = fx.employer("hr@rival.test", "Rival");
        let admin = fx.admin();
        let job = fx.post_job(&acme, "Rust dev").await;

        let err = fx
            .facade
            .set_job_status(&rival, job.id, JobStatus::Archived)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = fx
            .facade
            .set_job_status(&acme, job.id, JobStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        assert_eq!(
            fx.facade
                .set_job_status(&acme, job.id, JobStatus::Archived)
                .await
                .expect("owner archives"),
            JobStatus::Archived
        );
        assert_eq!(
            fx.facade
                .set_job_status(&admin, job.id, JobStatus::Rejected)
                .await
                .expect("admin rejects"),
            JobStatus::Rejected
        );
    }

    #[tokio::test]
    async fn owner_cannot_rename_company() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let admin = fx.admin();
        let job = fx.post_job(&acme, "Rust dev").await;

        let rename = || JobPatch {
            company: Some("Google".into()),
            ..JobPatch::default()
        };
        let err = fx.facade.update_job(&acme, job.id, rename()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(fx.facade.get_job(job.id).await.unwrap().company, "Acme");

        let renamed = fx.facade.update_job(&admin, job.id, rename()).await.expect("admin");
        assert_eq!(renamed.company, "Google");
    }

    #[tokio::test]
    async fn rejected_job_stays_rejected_for_its_owner() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let admin = fx.admin();
        let job = fx.post_job(&acme, "Rust dev").await;
        fx.facade
            .set_job_status(&admin, job.id, JobStatus::Rejected)
            .await
            .expect("admin rejects");

        for status in [JobStatus::Active, JobStatus::Archived] {
            let err = fx
                .facade
                .set_job_status(&acme, job.id, status)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
        }
        assert_eq!(fx.facade.get_job(job.id).await.unwrap().status, JobStatus::Rejected);

        assert_eq!(
            fx.facade
                .set_job_status(&admin, job.id, JobStatus::Active)
                .await
                .expect("admin restores"),
            JobStatus::Active
        );
    }

    #[tokio::test]
    async fn demoted_admin_edits_only_own_jobs() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let admin = fx.admin();
        let job = fx.post_job(&acme, "Rust dev").await;
        fx.store
            .update_profile(
                admin.user_id,
                ProfilePatch {
                    role: Some(crate::session::Role::Employer),
                    ..ProfilePatch::default()
                },
            )
            .await
            .expect("demote");

        let err = fx
            .facade
            .set_job_status(&admin, job.id, JobStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn apply_url_and_expiry_can_be_cleared() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let job = fx
            .facade
            .create_job(
                &acme,
                JobFields {
                    apply_url: Some("https://acme.test/apply".into()),
                    expires_at: Some(OffsetDateTime::now_utc() + time::Duration::days(30)),
                    ..JobFields::titled("Rust dev")
                },
            )
            .await
            .expect("create");
        assert!(job.apply_url.is_some() && job.expires_at.is_some());

        let untouched = fx
            .facade
            .update_job(
                &acme,
                job.id,
                JobPatch {
                    title: Some("Senior Rust dev".into()),
                    ..JobPatch::default()
                },
            )
            .await
            .expect("edit title");
        assert_eq!(untouched.apply_url, job.apply_url);
        assert_eq!(untouched.expires_at, job.expires_at);

        let cleared = fx
            .facade
            .update_job(
                &acme,
                job.id,
                JobPatch {
                    apply_url: Some(Some("  ".into())),
                    expires_at: Some(None),
                    ..JobPatch::default()
                },
            )
            .await
            .expect("clear");
        assert_eq!(cleared.apply_url, None);
        assert_eq!(cleared.expires_at, None);
    }

    #[test]
    fn job_patch_distinguishes_absent_from_null() {
        let patch: JobPatch =
            serde_json::from_str(r#"{"apply_url": null, "title": "x"}"#).expect("patch");
        assert_eq!(patch.apply_url, Some(None));
        assert_eq!(patch.expires_at, None);

        let patch: JobPatch =
            serde_json::from_str(r#"{"expires_at": "2030-01-01T00:00:00Z"}"#).expect("patch");
        assert!(matches!(patch.expires_at, Some(Some(_))));
        assert_eq!(patch.apply_url, None);
    }

    #[tokio::test]
    async fn featured_jobs_come_first_and_are_capped() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let admin = fx.admin();
        let mut ids = Vec::new();
        for i in 0..10 {
            ids.push(fx.post_job(&acme, &format!("Job {i}")).await.id);
        }
        fx.facade
            .update_job(
                &admin,
                ids[0],
                JobPatch {
                    featured: Some(true),
                    ..JobPatch::default()
                },
            )
            .await
            .expect("feature");
        fx.facade
            .set_job_status(&acme, ids[9], JobStatus::Archived)
            .await
            .expect("archive");

        let featured = fx.facade.featured_jobs(FEATURED_LIMIT).await.expect("featured");
        assert_eq!(featured.len(), 8);
        assert_eq!(featured[0].id, ids[0]);
        assert_eq!(featured[1].id, ids[8], "then newest active");
        assert!(featured.iter().all(|j| j.id != ids[9]));
    }

    #[tokio::test]
    async fn store_errors_are_passed_through_verbatim() {
        let fx = Fixture::new();
        fx.store.fail("list_jobs", "permission denied for table jobs");
        let err = fx.facade.list_jobs().await.unwrap_err();
        assert_eq!(err.to_string(), "permission denied for table jobs");
        assert!(matches!(err, AppError::Store(_)));
    }

    #[tokio::test]
    async fn missing_job_is_not_found() {
        let fx = Fixture::new();
        let err = fx.facade.get_job(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
