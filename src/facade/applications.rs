use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{decode_base64, sanitize::strip_tags, Facade};
use crate::{
    error::{AppError, AppResult, ValidationError},
    storage::{resume_key, sniff_content_type, PRESIGN_TTL_SECS},
    session::Session,
    store::types::{Application, ApplicationFilter, ApplicationStatus, JobFilter, NewApplication},
};

/// A job seeker's application as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitApplication {
    pub job_id: Uuid,
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub attachment_base64: Option<String>,
    #[serde(default)]
    pub answers: Vec<String>,
}

impl SubmitApplication {
    pub fn text(job_id: Uuid, resume_text: &str) -> Self {
        Self {
            job_id,
            resume_text: resume_text.to_string(),
            ..Self::default()
        }
    }
}

impl Facade {
    pub async fn list_applications_for_applicant(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<Application>> {
        let filter = ApplicationFilter {
            applicant_id: Some(user_id),
            ..ApplicationFilter::default()
        };
        Ok(self.store.list_applications(&filter).await?)
    }

    /// Applications to any of the employer's jobs. Resolved in two steps: the
    /// employer's job ids first, then applications whose job is in that set.
    pub async fn list_applications_for_employer(
        &self,
        employer_id: Uuid,
    ) -> AppResult<Vec<Application>> {
        let jobs = self
            .store
            .list_jobs(&JobFilter {
                employer_id: Some(employer_id),
                ..JobFilter::default()
            })
            .await?;
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        let filter = ApplicationFilter {
            job_ids: Some(jobs.into_iter().map(|j| j.id).collect()),
            ..ApplicationFilter::default()
        };
        Ok(self.store.list_applications(&filter).await?)
    }

    pub async fn list_all_applications(&self, session: &Session) -> AppResult<Vec<Application>> {
        self.require_admin(session).await?;
        Ok(self
            .store
            .list_applications(&ApplicationFilter::default())
            .await?)
    }

    #[instrument(skip(self, session, input), fields(user_id = %session.user_id, job_id = %input.job_id))]
    pub async fn submit_application(
        &self,
        session: &Session,
        input: SubmitApplication,
    ) -> AppResult<Application> {
        let job = self.get_job(input.job_id).await?;
        if job.is_owned_by(session.user_id) {
            warn!("owner tried to apply to own job");
            return Err(AppError::Forbidden(
                "Employers cannot apply to their own job.".into(),
            ));
        }
        if !job.is_open(OffsetDateTime::now_utc()) {
            return Err(ValidationError::JobClosed.into());
        }
        self.active_profile(session).await?;

        let resume_text = strip_tags(&input.resume_text);
        let attachment = input
            .attachment_base64
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .map(decode_base64)
            .transpose()?;
        if resume_text.is_empty() && attachment.is_none() {
            return Err(ValidationError::Required("resume").into());
        }
        if input.answers.len() > job.additional_questions.len() {
            return Err(ValidationError::TooManyAnswers(job.additional_questions.len()).into());
        }
        let answers = input.answers.iter().map(|a| strip_tags(a)).collect();

        let attachment_key = match attachment {
            Some(body) => {
                let content_type = sniff_content_type(&body);
                let key = resume_key(session.user_id, job.id, content_type);
                self.storage
                    .put_object(&key, Bytes::from(body), content_type)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "attachment upload failed");
                        AppError::Internal(e.context("store résumé attachment"))
                    })?;
                Some(key)
            }
            None => None,
        };

        let inserted = self
            .store
            .insert_application(NewApplication {
                job_id: job.id,
                applicant_id: session.user_id,
                resume_text,
                attachment_key: attachment_key.clone(),
                answers,
            })
            .await;
        match inserted {
            Ok(application) => {
                info!(application_id = %application.id, "application submitted");
                Ok(application)
            }
            Err(e) => {
                if let Some(key) = attachment_key {
                    self.discard_object(&key).await;
                }
                Err(e.into())
            }
        }
    }

    /// Accepts or rejects an application. Returns the status now stored so
    /// callers can patch local state without re-reading.
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn set_application_status(
        &self,
        session: &Session,
        id: Uuid,
        status: ApplicationStatus,
    ) -> AppResult<ApplicationStatus> {
        let application = self
            .store
            .find_application(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".into()))?;
        let profile = self.active_profile(session).await?;
        if !Self::acts_as_admin(session, &profile) {
            let owns_job = self
                .store
                .find_job(application.job_id)
                .await?
                .is_some_and(|job| job.is_owned_by(session.user_id));
            if !owns_job {
                return Err(AppError::Forbidden(
                    "Only the job owner or an admin can review this application".into(),
                ));
            }
        }

        if !application.status.can_become(status) {
            return Err(ValidationError::StatusTransition {
                from: application.status,
                to: status,
            }
            .into());
        }
        if application.status == status {
            return Ok(status);
        }
        let Some(updated) = self.store.update_application_status(id, status).await? else {
            // Decided by someone else between the read and the write.
            let current = self
                .store
                .find_application(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Application not found".into()))?;
            warn!(application_id = %id, from = %current.status, to = %status, "lost review race");
            return Err(ValidationError::StatusTransition {
                from: current.status,
                to: status,
            }
            .into());
        };
        info!(application_id = %id, status = %updated.status, "application reviewed");
        Ok(updated.status)
    }

    /// Short-lived download link for an application's attachment. Visible to
    /// the applicant, the job's owner and admins.
    pub async fn attachment_url(&self, session: &Session, id: Uuid) -> AppResult<String> {
        let application = self
            .store
            .find_application(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".into()))?;
        let allowed = session.is_admin()
            || application.applicant_id == session.user_id
            || self
                .store
                .find_job(application.job_id)
                .await?
                .is_some_and(|job| job.is_owned_by(session.user_id));
        if !allowed {
            return Err(AppError::Forbidden("Not allowed to view this attachment".into()));
        }
        let key = application
            .attachment_key
            .ok_or_else(|| AppError::NotFound("Application has no attachment".into()))?;
        Ok(self.storage.presign_get(&key, PRESIGN_TTL_SECS).await?)
    }
}
