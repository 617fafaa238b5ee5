//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Default idle window before a real-time validation pass runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the onboarding persistence API.
    pub api_base_url: String,
    /// Per-request timeout owned by the HTTP boundary.
    pub request_timeout: Duration,
    /// Idle window for debounced real-time validation.
    pub debounce: Duration,
    /// Path of the step-save endpoint. `{phase}` is replaced by the phase
    /// slug and `{step}` by the step number.
    pub save_path: String,
    /// Path of the draft-load endpoint.
    pub draft_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            debounce: DEFAULT_DEBOUNCE,
            save_path: "/api/onboarding/{phase}/steps/{step}".to_string(),
            draft_path: "/api/onboarding/draft".to_string(),
        }
    }
}

impl EngineConfig {
    /// Build a configuration from `ONBOARD_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("ONBOARD_API_URL") {
            let url = url.trim().trim_end_matches('/').to_string();
            if url.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "ONBOARD_API_URL".into(),
                    message: "must not be empty".into(),
                });
            }
            config.api_base_url = url;
        }
        if let Some(secs) = lookup("ONBOARD_HTTP_TIMEOUT_SECS") {
            let secs = parse_u64("ONBOARD_HTTP_TIMEOUT_SECS", &secs)?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = lookup("ONBOARD_DEBOUNCE_MS") {
            config.debounce = Duration::from_millis(parse_u64("ONBOARD_DEBOUNCE_MS", &ms)?);
        }

        Ok(config)
    }

    /// Full URL of the save endpoint for a given step.
    pub fn save_url(&self, phase: &str, step: u32) -> String {
        let path = self
            .save_path
            .replace("{phase}", phase)
            .replace("{step}", &step.to_string());
        format!("{}{}", self.api_base_url, path)
    }

    /// Full URL of the draft endpoint.
    pub fn draft_url(&self) -> String {
        format!("{}{}", self.api_base_url, self.draft_path)
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{e}"),
    })
}
