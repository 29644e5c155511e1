use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{lookup, Section, UNKNOWN_APPLICANT};
use crate::{
    error::AppResult,
    facade::Facade,
    session::Session,
    store::types::{Application, ApplicationStatus, Job, Profile},
};

#[derive(Debug, Clone, Serialize)]
pub struct Applicant {
    pub application: Application,
    pub applicant_email: String,
    pub applicant_name: String,
}

impl Applicant {
    fn new(application: Application, profile: Option<&Profile>) -> Self {
        let (applicant_email, applicant_name) = match profile {
            Some(p) => (p.email.clone(), p.full_name.clone()),
            None => (UNKNOWN_APPLICANT.to_string(), String::new()),
        };
        Self {
            application,
            applicant_email,
            applicant_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployerJob {
    pub job: Job,
    pub applicants: Vec<Applicant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployerDashboard {
    pub jobs: Section<EmployerJob>,
    /// Set when the applications (or their applicants) could not be loaded;
    /// jobs are still listed with no applicants.
    pub applications_error: Option<String>,
}

impl EmployerDashboard {
    #[instrument(skip_all, fields(user_id = %session.user_id))]
    pub async fn load(facade: &Facade, session: &Session) -> Self {
        let (jobs, applications) = tokio::join!(
            facade.list_employer_jobs(session.user_id),
            facade.list_applications_for_employer(session.user_id),
        );
        let jobs = Section::from_result("jobs", jobs);
        let applications = Section::from_result("applications", applications);

        let applicant_ids: Vec<Uuid> = applications
            .items
            .iter()
            .map(|a| a.applicant_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let profiles = Section::from_result("applicants", facade.profiles_by_ids(&applicant_ids).await);
        let by_user = lookup(&profiles.items, |p| p.id);

        let mut rows: Vec<EmployerJob> = jobs
            .items
            .into_iter()
            .map(|job| EmployerJob {
                job,
                applicants: Vec::new(),
            })
            .collect();
        // Applications whose job disappeared between the two fetches are dropped.
        for application in applications.items {
            if let Some(row) = rows.iter_mut().find(|r| r.job.id == application.job_id) {
                let profile = by_user.get(&application.applicant_id).copied();
                row.applicants.push(Applicant::new(application, profile));
            }
        }

        Self {
            jobs: Section {
                items: rows,
                error: jobs.error,
            },
            applications_error: applications.error.or(profiles.error),
        }
    }

    pub fn applicant_count(&self) -> usize {
        self.jobs.items.iter().map(|r| r.applicants.len()).sum()
    }

    /// Reviews an application and updates the matching row in place.
    #[instrument(skip(self, facade, session))]
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
        let row = self
            .jobs
            .items
            .iter_mut()
            .flat_map(|r| r.applicants.iter_mut())
            .find(|a| a.application.id == application_id);
        if let Some(applicant) = row {
            applicant.application.status = stored;
        }
        info!(%application_id, status = %stored, "dashboard updated");
        Ok(())
    }
}
