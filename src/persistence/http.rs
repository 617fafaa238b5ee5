//! HTTP step backend over `reqwest`.
//!
//! Sends a JSON document when the payload carries no local files and
//! `multipart/form-data` otherwise. Non-2xx answers become
//! [`PersistenceError::Rejected`] with the server's message and field map.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::PersistenceError;
use crate::mapping::{ApiPayload, WireEncoding};

use super::traits::{DraftSnapshot, SaveAck, StepBackend, StepTarget};

/// Error body returned by the API on rejection.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "errorMessage", alias = "error", alias = "detail")]
    message: Option<String>,
    #[serde(default, alias = "fieldErrors", alias = "field_errors")]
    errors: BTreeMap<String, Value>,
}

pub struct HttpBackend {
    config: EngineConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: EngineConfig) -> Result<Self, PersistenceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PersistenceError::RequestFailed(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn multipart_form(payload: &ApiPayload) -> Result<Form, PersistenceError> {
        let mut form = Form::new();
        for (key, text) in payload.text_parts() {
            form = form.text(key, text);
        }
        for file in &payload.files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.content_type)
                .map_err(|e| PersistenceError::Encoding(e.to_string()))?;
            form = form.part(file.field.clone(), part);
        }
        Ok(form)
    }
}

#[async_trait]
impl StepBackend for HttpBackend {
    async fn save_step(
        &self,
        target: &StepTarget,
        payload: &ApiPayload,
        draft: bool,
    ) -> Result<SaveAck, PersistenceError> {
        let url = format!("{}?draft={draft}", self.config.save_url(&target.phase, target.step));
        let request = self.client.post(&url);
        let request = match payload.encoding {
            WireEncoding::Json => request.json(&payload.to_json()),
            WireEncoding::Multipart => request.multipart(Self::multipart_form(payload)?),
        };

        debug!(
            phase = %target.phase,
            step = target.step,
            draft,
            encoding = %payload.encoding,
            "Submitting step"
        );

        let resp = request.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Step save request failed");
            PersistenceError::RequestFailed(e.to_string())
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PersistenceError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            warn!(
                status = %status,
                phase = %target.phase,
                step = target.step,
                "Step save rejected"
            );
            return Err(rejection(status, &body));
        }

        let ack: SaveAck = if body.trim().is_empty() {
            SaveAck {
                success: true,
                ..Default::default()
            }
        } else {
            serde_json::from_str(&body)
                .map_err(|e| PersistenceError::InvalidResponse(e.to_string()))?
        };

        if !ack.success {
            return Err(rejection(status, &body));
        }

        info!(phase = %target.phase, step = target.step, draft, "Step saved");
        Ok(ack)
    }

    async fn load_draft(&self) -> Result<Option<DraftSnapshot>, PersistenceError> {
        let resp = self
            .client
            .get(self.config.draft_url())
            .send()
            .await
            .map_err(|e| PersistenceError::RequestFailed(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PersistenceError::InvalidResponse(e.to_string()))?;
        if !status.is_success() {
            return Err(rejection(status, &body));
        }
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }

        let draft: DraftSnapshot = serde_json::from_str(&body)
            .map_err(|e| PersistenceError::InvalidResponse(e.to_string()))?;
        Ok(Some(draft))
    }
}

/// Turn an error response into `Rejected`. Field errors may be a string or
/// a list of strings per key; the first message wins.
fn rejection(status: reqwest::StatusCode, body: &str) -> PersistenceError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let field_errors = parsed
        .errors
        .into_iter()
        .filter_map(|(key, value)| {
            let message = match value {
                Value::String(s) => s,
                Value::Array(items) => items.first()?.as_str()?.to_string(),
                _ => return None,
            };
            Some((key, message))
        })
        .collect();
    PersistenceError::Rejected {
        message: parsed
            .message
            .unwrap_or_else(|| format!("Save failed with status {status}")),
        field_errors,
    }
}
