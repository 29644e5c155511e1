//! Job seeker's application flow:
//! `Idle -> FormOpen -> FileParsing -> FormOpen -> Submitting -> Success | Failure`.
//! A failure keeps the form so the seeker can fix it and submit again.

use std::path::Path;

use base64ct::{Base64, Encoding};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::services::is_valid_email,
    facade::{Facade, SubmitApplication},
    session::Session,
    store::types::{Application, Job},
};

const PARSED_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

lazy_static! {
    static ref NAME_RE: Regex = Regex::new(r"(?i)Name[:\s]+([A-Za-z \t]+)").unwrap();
    static ref EMAIL_RE: Regex =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ApplyState {
    Idle,
    FormOpen,
    FileParsing,
    Submitting,
    Success(Application),
    Failure(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Attachment {
    pub file_name: String,
    pub base64: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplicationForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub cover_letter: String,
    pub attachment: Option<Attachment>,
    /// One entry per additional question on the job.
    pub answers: Vec<String>,
}

/// Name and e-mail found in a résumé's text, if any.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ContactDetails {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub fn parse_contact_details(text: &str) -> ContactDetails {
    let name = NAME_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|n| !n.is_empty());
    let email = EMAIL_RE.find(text).map(|m| m.as_str().to_string());
    ContactDetails { name, email }
}

fn extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct ApplyFlow {
    state: ApplyState,
    job: Option<Job>,
    pub form: ApplicationForm,
    pending_file: Option<String>,
}

impl Default for ApplyFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyFlow {
    pub fn new() -> Self {
        Self {
            state: ApplyState::Idle,
            job: None,
            form: ApplicationForm::default(),
            pending_file: None,
        }
    }

    pub fn state(&self) -> &ApplyState {
        &self.state
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    /// Inline error shown under the form, if the last step failed.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ApplyState::Failure(message) => Some(message),
            _ => None,
        }
    }

    fn editable(&self) -> bool {
        matches!(self.state, ApplyState::FormOpen | ApplyState::Failure(_))
    }

    /// Opens a blank form for `job`.
    pub fn open(&mut self, job: Job) {
        self.form = ApplicationForm {
            answers: vec![String::new(); job.additional_questions.len()],
            ..ApplicationForm::default()
        };
        self.job = Some(job);
        self.pending_file = None;
        self.state = ApplyState::FormOpen;
    }

    pub fn close(&mut self) {
        *self = Self::new();
    }

    /// Starts reading a chosen file. Only PDF and Word documents are accepted.
    pub fn select_file(&mut self, file_name: &str) -> bool {
        if !self.editable() {
            return false;
        }
        if !PARSED_EXTENSIONS.contains(&extension(file_name).as_str()) {
            self.state = ApplyState::Failure("Resume must be a PDF or Word document".into());
            return false;
        }
        self.pending_file = Some(file_name.to_string());
        self.state = ApplyState::FileParsing;
        true
    }

    /// Finishes reading the selected file: keeps it as the attachment and
    /// fills name and e-mail from its text where they are found.
    pub fn file_loaded(&mut self, bytes: &[u8]) {
        if self.state != ApplyState::FileParsing {
            return;
        }
        let Some(file_name) = self.pending_file.take() else {
            return;
        };
        let found = parse_contact_details(&String::from_utf8_lossy(bytes));
        if let Some(name) = found.name {
            self.form.full_name = name;
        }
        if let Some(email) = found.email {
            self.form.email = email;
        }
        self.form.attachment = Some(Attachment {
            file_name,
            base64: Base64::encode_string(bytes),
        });
        self.state = ApplyState::FormOpen;
    }

    pub fn attach_file(&mut self, file_name: &str, bytes: &[u8]) -> bool {
        if !self.select_file(file_name) {
            return false;
        }
        self.file_loaded(bytes);
        true
    }

    fn validate(&self) -> Result<(), String> {
        if self.form.full_name.trim().is_empty() {
            return Err("Full name is required".into());
        }
        if !is_valid_email(self.form.email.trim()) {
            return Err("A valid email is required".into());
        }
        Ok(())
    }

    /// Submits the form. Returns the stored application on success so the
    /// caller can update its dashboard.
    #[instrument(skip_all, fields(user_id = %session.user_id))]
    pub async fn submit(&mut self, facade: &Facade, session: &Session) -> Option<Application> {
        if !self.editable() {
            warn!(state = ?self.state, "submit ignored");
            return None;
        }
        let Some(job_id) = self.job.as_ref().map(|j| j.id) else {
            return None;
        };
        if let Err(message) = self.validate() {
            self.state = ApplyState::Failure(message);
            return None;
        }

        self.state = ApplyState::Submitting;
        let input = SubmitApplication {
            job_id,
            resume_text: self.form.cover_letter.trim().to_string(),
            attachment_base64: self.form.attachment.as_ref().map(|a| a.base64.clone()),
            answers: self.form.answers.clone(),
        };
        match facade.submit_application(session, input).await {
            Ok(application) => {
                info!(application_id = %application.id, "application submitted");
                self.state = ApplyState::Success(application.clone());
                Some(application)
            }
            Err(e) => {
                warn!(error = %e, "application failed");
                self.state = ApplyState::Failure(e.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::seeker::SeekerDashboard;
    use crate::facade::fixture::Fixture;
    use crate::facade::JobFields;

    #[test]
    fn parses_name_and_email_from_text() {
        let found = parse_contact_details("Resume\nNAME: Ada Lovelace\nContact ada@example.com");
        assert_eq!(found.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(found.email.as_deref(), Some("ada@example.com"));
        assert_eq!(parse_contact_details("nothing here"), ContactDetails::default());
    }

    #[tokio::test]
    async fn rejects_unsupported_file_type_inline() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let mut flow = ApplyFlow::new();
        flow.open(fx.post_job(&acme, "Rust dev").await);

        assert!(!flow.attach_file("photo.png", b"\x89PNG"));
        assert_eq!(flow.error(), Some("Resume must be a PDF or Word document"));
        assert!(flow.form.attachment.is_none());

        assert!(flow.attach_file("CV.DOCX", b"Name: Grace Hopper\ngrace@navy.test"));
        assert_eq!(flow.state(), &ApplyState::FormOpen);
        assert_eq!(flow.form.full_name, "Grace Hopper");
    }

    #[tokio::test]
    async fn file_parsing_is_a_distinct_step() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let mut flow = ApplyFlow::new();
        flow.open(fx.post_job(&acme, "Rust dev").await);
        flow.form.full_name = "Typed Name".into();

        assert!(flow.select_file("cv.pdf"));
        assert_eq!(flow.state(), &ApplyState::FileParsing);
        flow.file_loaded(b"%PDF-1.4 contact: me@example.com");
        assert_eq!(flow.form.full_name, "Typed Name", "kept when not found");
        assert_eq!(flow.form.email, "me@example.com");
        let attachment = flow.form.attachment.as_ref().expect("attachment");
        assert_eq!(attachment.file_name, "cv.pdf");
    }

    #[tokio::test]
    async fn apply_end_to_end_updates_dashboard() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let seeker = fx.seeker("ada@example.com");
        let job = fx.post_job(&acme, "Rust dev").await;
        let mut dash = SeekerDashboard::load(&fx.facade, &seeker).await;

        let mut flow = ApplyFlow::new();
        flow.open(dash.available.items[0].clone());
        flow.attach_file("cv.pdf", b"%PDF-1.4\nName: Ada Lovelace\nada@example.com\n");
        assert_eq!(flow.form.full_name, "Ada Lovelace");
        assert_eq!(flow.form.email, "ada@example.com");

        let application = flow.submit(&fx.facade, &seeker).await.expect("submitted");
        assert!(matches!(flow.state(), ApplyState::Success(_)));
        assert_eq!(application.job_id, job.id);
        assert!(application.attachment_key.is_some());
        assert_eq!(fx.storage.len(), 1);

        dash.mark_applied(application);
        assert!(dash.available.items.is_empty());
        assert_eq!(dash.applied.items[0].job_title, "Rust dev");
    }

    #[tokio::test]
    async fn failure_keeps_form_and_allows_resubmission() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let seeker = fx.seeker("s@x.test");
        let job = fx
            .facade
            .create_job(
                &acme,
                JobFields {
                    additional_questions: vec!["Why us?".into()],
                    ..JobFields::titled("Rust dev")
                },
            )
            .await
            .expect("job");

        let mut flow = ApplyFlow::new();
        flow.open(job);
        assert_eq!(flow.form.answers.len(), 1);
        flow.form.full_name = "Sam".into();
        flow.form.email = "not-an-email".into();
        assert!(flow.submit(&fx.facade, &seeker).await.is_none());
        assert_eq!(flow.error(), Some("A valid email is required"));

        flow.form.email = "s@x.test".into();
        assert!(flow.submit(&fx.facade, &seeker).await.is_none());
        assert_eq!(flow.error(), Some("resume is required"));
        assert_eq!(flow.form.full_name, "Sam");

        flow.form.cover_letter = "I like Rust".into();
        flow.form.answers[0] = "Because".into();
        let application = flow.submit(&fx.facade, &seeker).await.expect("resubmitted");
        assert_eq!(application.answers, vec!["Because".to_string()]);
        assert!(flow.submit(&fx.facade, &seeker).await.is_none(), "done");
    }

    #[tokio::test]
    async fn owner_cannot_apply_to_own_job() {
        let fx = Fixture::new();
        let acme = fx.employer("hr@acme.test", "Acme");
        let mut flow = ApplyFlow::new();
        flow.open(fx.post_job(&acme, "Rust dev").await);
        flow.form.full_name = "HR".into();
        flow.form.email = "hr@acme.test".into();
        flow.form.cover_letter = "me".into();

        assert!(flow.submit(&fx.facade, &acme).await.is_none());
        assert_eq!(flow.error(), Some("Employers cannot apply to their own job."));
    }
}
