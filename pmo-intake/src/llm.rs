//! External model-call interface.

use async_trait::async_trait;

use crate::error::Result;

/// One call to the language model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    /// Caller-supplied key forwarded as-is; overrides the backend's own key.
    pub access_key: Option<String>,
}

/// Anything that can turn an instruction plus a user message into text.
///
/// Streaming backends must concatenate their chunks before returning.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[cfg(feature = "rig")]
pub use rig_backend::OpenRouterBackend;

#[cfg(feature = "rig")]
mod rig_backend {
    use async_trait::async_trait;
    use rig::{client::CompletionClient, completion::Chat, providers::openrouter};
    use tracing::debug;

    use super::{CompletionBackend, CompletionRequest};
    use crate::error::{IntakeError, Result};

    /// Chat-completion backend served through OpenRouter.
    #[derive(Debug, Clone)]
    pub struct OpenRouterBackend {
        api_key: Option<String>,
        model: String,
        temperature: f64,
    }

    impl OpenRouterBackend {
        pub fn new(api_key: Option<String>, model: impl Into<String>, temperature: f64) -> Self {
            Self {
                api_key,
                model: model.into(),
                temperature,
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for OpenRouterBackend {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            let api_key = request
                .access_key
                .as_deref()
                .or(self.api_key.as_deref())
                .ok_or_else(|| IntakeError::ModelCallFailed("OPENROUTER_API_KEY not set".into()))?;

            let client = openrouter::Client::new(api_key);
            let agent = client
                .agent(&self.model)
                .preamble(&request.system_prompt)
                .temperature(self.temperature)
                .build();

            debug!(model = %self.model, "Sending extraction request");
            agent
                .chat(request.user_message.as_str(), vec![])
                .await
                .map_err(|e| IntakeError::ModelCallFailed(e.to_string()))
        }
    }
}
