use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{error, info, warn};

use crate::{
    error::{IntakeError, Result},
    submission::SubmissionPayload,
};

pub const DEFAULT_WEBHOOK_URL: &str = "https://natsha.pythonanywhere.com/webhook/ai-program-create";
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Terminal sink for completed records.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Delivers `payload` once. Returns true only when the receiver accepted it.
    async fn submit(&self, payload: &SubmissionPayload) -> bool;
}

/// Posts completed records to the reporting webhook. No retries.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntakeError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReportSink for WebhookClient {
    async fn submit(&self, payload: &SubmissionPayload) -> bool {
        info!(
            url = %self.url,
            program_name = %payload.program_name,
            "Submitting program update"
        );

        match self.client.post(&self.url).json(payload).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                info!(url = %self.url, "Webhook accepted submission");
                true
            }
            Ok(response) => {
                warn!(
                    url = %self.url,
                    status = %response.status(),
                    "Webhook rejected submission"
                );
                false
            }
            Err(e) => {
                error!(url = %self.url, error = %e, "Webhook submission error");
                false
            }
        }
    }
}
