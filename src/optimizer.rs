use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct OptimizeRequest<'a> {
    resume: &'a str,
    job_description: &'a str,
}

#[derive(Debug, Deserialize)]
struct OptimizeResponse {
    optimized_resume: String,
}

/// Client for the external résumé optimization service.
#[derive(Clone)]
pub struct ResumeOptimizer {
    http: Client,
    url: String,
}

impl ResumeOptimizer {
    pub fn new(url: &str) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            http,
            url: url.to_string(),
        }
    }

    #[instrument(skip_all, fields(resume_len = resume.len()))]
    pub async fn optimize(&self, resume: &str, job_description: &str) -> AppResult<String> {
        let resp = self
            .http
            .post(&self.url)
            .json(&OptimizeRequest {
                resume,
                job_description,
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "optimizer unreachable");
                AppError::Upstream("Resume optimizer unavailable".into())
            })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!(%status, %body, "optimizer rejected request");
            return Err(AppError::Upstream(format!(
                "Resume optimizer returned {status}"
            )));
        }
        let body: OptimizeResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed optimizer response: {e}")))?;
        Ok(body.optimized_resume)
    }
}
