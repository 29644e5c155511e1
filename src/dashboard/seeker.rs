use std::collections::HashSet;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::instrument;

use super::{lookup, Fetched, Section, MISSING_JOB};
use crate::{
    facade::{Facade, ProfileView},
    session::Session,
    store::types::{Application, Job},
};

#[derive(Debug, Clone, Serialize)]
pub struct AppliedJob {
    pub application: Application,
    pub job_title: String,
    pub company: String,
}

impl AppliedJob {
    fn new(application: Application, job: Option<&Job>) -> Self {
        match job {
            Some(job) => Self {
                job_title: job.title.clone(),
                company: job.company.clone(),
                application,
            },
            None => Self {
                job_title: MISSING_JOB.to_string(),
                company: String::new(),
                application,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeekerDashboard {
    /// Open jobs the seeker neither owns nor has applied to.
    pub available: Section<Job>,
    pub applied: Section<AppliedJob>,
    pub profile: Fetched<ProfileView>,
}

impl SeekerDashboard {
    #[instrument(skip_all, fields(user_id = %session.user_id))]
    pub async fn load(facade: &Facade, session: &Session) -> Self {
        let (jobs, applications, profile) = tokio::join!(
            facade.list_jobs(),
            facade.list_applications_for_applicant(session.user_id),
            facade.profile_view(session),
        );
        let jobs = Section::from_result("jobs", jobs);
        let applications = Section::from_result("applications", applications);

        let by_id = lookup(&jobs.items, |j| j.id);
        let applied_ids: HashSet<_> = applications.items.iter().map(|a| a.job_id).collect();
        let now = OffsetDateTime::now_utc();

        let available = Section {
            items: jobs
                .items
                .iter()
                .filter(|j| j.is_open(now))
                .filter(|j| !j.is_owned_by(session.user_id))
                .filter(|j| !applied_ids.contains(&j.id))
                .cloned()
                .collect(),
            error: jobs.error.clone(),
        };
        let applied = Section {
            items: applications
                .items
                .into_iter()
                .map(|a| {
                    let job = by_id.get(&a.job_id).copied();
                    AppliedJob::new(a, job)
                })
                .collect(),
            error: applications.error,
        };

        Self {
            available,
            applied,
            profile: Fetched::from_result("profile", profile),
        }
    }

    /// Moves the job of a freshly submitted application from `available` to
    /// `applied` without re-fetching.
    pub fn mark_applied(&mut self, application: Application) {
        let job = self
            .available
            .items
            .iter()
            .position(|j| j.id == application.job_id)
            .map(|i| self.available.items.remove(i));
        if self
            .applied
            .items
            .iter()
            .any(|a| a.application.id == application.id)
        {
            return;
        }
        self.applied
            .items
            .insert(0, AppliedJob::new(application, job.as_ref()));
    }
}
