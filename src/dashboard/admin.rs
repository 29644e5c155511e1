use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{lookup, Section, MISSING_JOB, UNKNOWN_APPLICANT};
use crate::{
    error::AppResult,
    facade::Facade,
    session::Session,
    store::types::{Application, ApplicationStatus, Job, JobPatch, Profile},
};

#[derive(Debug, Clone, Serialize)]
pub struct AdminJob {
    pub job: Job,
    /// Poster's email, or the raw employer id when the profile is gone.
    pub employer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminApplication {
    pub application: Application,
    pub applicant: String,
    pub job_title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub users: Section<Profile>,
    pub jobs: Section<AdminJob>,
    pub applications: Section<AdminApplication>,
}

impl AdminDashboard {
    #[instrument(skip_all, fields(admin_id = %session.user_id))]
    pub async fn load(facade: &Facade, session: &Session) -> Self {
        let (users, jobs, applications) = tokio::join!(
            facade.list_profiles(session),
            facade.list_jobs(),
            facade.list_all_applications(session),
        );
        let users = Section::from_result("users", users);
        let jobs = Section::from_result("jobs", jobs);
        let applications = Section::from_result("applications", applications);

        let by_user = lookup(&users.items, |p| p.id);
        let by_job = lookup(&jobs.items, |j| j.id);

        let admin_applications = Section {
            items: applications
                .items
                .into_iter()
                .map(|application| AdminApplication {
                    applicant: by_user
                        .get(&application.applicant_id)
                        .map(|p| p.email.clone())
                        .unwrap_or_else(|| UNKNOWN_APPLICANT.to_string()),
                    job_title: by_job
                        .get(&application.job_id)
                        .map(|j| j.title.clone())
                        .unwrap_or_else(|| MISSING_JOB.to_string()),
                    application,
                })
                .collect(),
            error: applications.error,
        };
        let admin_jobs = Section {
            items: jobs
                .items
                .iter()
                .map(|job| AdminJob {
                    employer: by_user
                        .get(&job.employer_id)
                        .map(|p| p.email.clone())
                        .unwrap_or_else(|| job.employer_id.to_string()),
                    job: job.clone(),
                })
                .collect(),
            error: jobs.error.clone(),
        };

        Self {
            users,
            jobs: admin_jobs,
            applications: admin_applications,
        }
    }

    #[instrument(skip(self, facade, session))]
    pub async fn set_user_active(
        &mut self,
        facade: &Facade,
        session: &Session,
        user_id: Uuid,
        active: bool,
    ) -> AppResult<()> {
        let stored = facade.set_user_active(session, user_id, active).await?;
        if let Some(user) = self.users.items.iter_mut().find(|u| u.id == user_id) {
            user.is_active = stored;
        }
        info!(%user_id, active = stored, "dashboard updated");
        Ok(())
    }

    pub async fn set_application_status(
        &mut self,
        facade: &Facade,
        session: &Session,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> AppResult<()> {
        let stored = facade
            .set_application_status(session, application_id, status)
            .await?;
        if let Some(row) = self
            .applications
            .items
            .iter_mut()
            .find(|a| a.application.id == application_id)
        {
            row.application.status = stored;
        }
        Ok(())
    }

    /// Saves an edited posting and replaces the local copy with the stored one.
    pub async fn save_job(
        &mut self,
        facade: &Facade,
        session: &Session,
        job_id: Uuid,
        patch: JobPatch,
    ) -> AppResult<()> {
        let job = facade.update_job(session, job_id, patch).await?;
        for row in self
            .applications
            .items
            .iter_mut()
            .filter(|a| a.application.job_id == job_id)
        {
            row.job_title = job.title.clone();
        }
        if let Some(row) = self.jobs.items.iter_mut().find(|r| r.job.id == job_id) {
            row.job = job;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::facade::fixture::Fixture;
    use crate::store::types::JobStatus;

    #[tokio::test]
    async fn resolves_references_with_placeholders() {
        let fx = Fixture::new();
        let admin = fx.admin();
        let acme = fx.employer("hr@acme.test", "Acme");
        let seeker = fx.seeker("s@x.test");
        let kept = fx.post_job(&acme, "Kept").await;
        let gone = fx.post_job(&acme, "Gone").await;
        fx.apply(&seeker, kept.id, "cv").await;
        fx.apply(&seeker, gone.id, "cv").await;
        fx.store.remove_job(gone.id);

        let dash = AdminDashboard::load(&fx.facade, &admin).await;
        assert_eq!(dash.users.items.len(), 3);
        assert_eq!(dash.jobs.items.len(), 1);
        assert_eq!(dash.jobs.items[0].employer, "hr@acme.test");

        let mut titles: Vec<_> = dash
            .applications
            .items
            .iter()
            .map(|a| a.job_title.as_str())
            .collect();
        titles.sort_unstable();
        assert_eq!(titles, vec!["Job no longer available", "Kept"]);
        assert!(dash.applications.items.iter().all(|a| a.applicant == "s@x.test"));
    }

    #[tokio::test]
    async fn missing_poster_falls_back_to_id() {
        let fx = Fixture::new();
        let admin = fx.admin();
        let acme = fx.employer("hr@acme.test", "Acme");
        let job = fx.post_job(&acme, "Rust dev").await;
        fx.store.remove_profile(acme.user_id);

        let dash = AdminDashboard::load(&fx.facade, &admin).await;
        let row = dash.jobs.items.iter().find(|r| r.job.id == job.id).expect("row");
        assert_eq!(row.employer, acme.user_id.to_string());
    }

    #[tokio::test]
    async fn non_admin_sees_only_public_jobs() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let job = fx.post_job(&acme, "Rust dev").await;
        fx.apply(&fx.seeker("s@x.test"), job.id, "cv").await;

        let dash = AdminDashboard::load(&fx.facade, &acme).await;
        assert_eq!(dash.users.error.as_deref(), Some("Admin access required"));
        assert_eq!(dash.applications.error.as_deref(), Some("Admin access required"));
        assert!(dash.applications.items.is_empty());
        assert_eq!(dash.jobs.items.len(), 1);
    }

    #[tokio::test]
    async fn mutations_patch_local_state() {
        let fx = Fixture::new();
        let admin = fx.admin();
        let acme = fx.employer("hr@acme.test", "Acme");
        let seeker = fx.seeker("s@x.test");
        let job = fx.post_job(&acme, "Rust dev").await;
        let app = fx.apply(&seeker, job.id, "cv").await;
        let mut dash = AdminDashboard::load(&fx.facade, &admin).await;

        dash.set_user_active(&fx.facade, &admin, seeker.user_id, false)
            .await
            .expect("disable");
        let user = dash.users.items.iter().find(|u| u.id == seeker.user_id).expect("user");
        assert!(!user.is_active);

        dash.set_application_status(&fx.facade, &admin, app.id, ApplicationStatus::Rejected)
            .await
            .expect("reject");
        assert_eq!(
            dash.applications.items[0].application.status,
            ApplicationStatus::Rejected
        );

        dash.save_job(
            &fx.facade,
            &admin,
            job.id,
            JobPatch {
                title: Some("Senior Rust dev".into()),
                featured: Some(true),
                status: Some(JobStatus::Rejected),
                ..JobPatch::default()
            },
        )
        .await
        .expect("save");
        assert_eq!(dash.jobs.items[0].job.title, "Senior Rust dev");
        assert!(dash.jobs.items[0].job.featured);
        assert_eq!(dash.applications.items[0].job_title, "Senior Rust dev");

        let err = dash
            .set_user_active(&fx.facade, &admin, admin.user_id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
