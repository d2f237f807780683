use std::time::Duration;

use crate::{
    error::{IntakeError, Result},
    webhook::{DEFAULT_WEBHOOK_TIMEOUT, DEFAULT_WEBHOOK_URL},
};

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(45);

/// Runtime settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub model_timeout: Duration,
    pub webhook_url: String,
    pub webhook_timeout: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            webhook_timeout: DEFAULT_WEBHOOK_TIMEOUT,
        }
    }
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let temperature = match get("PMO_INTAKE_TEMPERATURE") {
            Some(raw) => raw.parse::<f64>().map_err(|_| {
                IntakeError::ConfigError(format!("PMO_INTAKE_TEMPERATURE is not a number: {raw}"))
            })?,
            None => defaults.temperature,
        };

        Ok(Self {
            api_key: get("OPENROUTER_API_KEY"),
            model: get("PMO_INTAKE_MODEL").unwrap_or(defaults.model),
            temperature,
            model_timeout: seconds(get("PMO_INTAKE_MODEL_TIMEOUT_SECS"), "PMO_INTAKE_MODEL_TIMEOUT_SECS")?
                .unwrap_or(defaults.model_timeout),
            webhook_url: get("PMO_INTAKE_WEBHOOK_URL").unwrap_or(defaults.webhook_url),
            webhook_timeout: seconds(
                get("PMO_INTAKE_WEBHOOK_TIMEOUT_SECS"),
                "PMO_INTAKE_WEBHOOK_TIMEOUT_SECS",
            )?
            .unwrap_or(defaults.webhook_timeout),
        })
    }
}

fn seconds(raw: Option<String>, key: &str) -> Result<Option<Duration>> {
    raw.map(|raw| {
        raw.parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| IntakeError::ConfigError(format!("{key} must be a positive integer: {raw}")))
    })
    .transpose()
}
