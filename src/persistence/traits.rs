//! `StepBackend`: the async seam between the wizard and remote storage.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PersistenceError;
use crate::mapping::ApiPayload;

/// Where a save goes: the phase slug plus the section's step number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepTarget {
    pub phase: String,
    pub step: u32,
}

/// Server acknowledgment of a step save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveAck {
    #[serde(default = "default_success")]
    pub success: bool,
    /// Backend-shaped data as stored by the server. Authoritative for
    /// derived fields.
    #[serde(default, rename = "data", alias = "serverEchoedData")]
    pub server_echoed_data: Map<String, Value>,
}

fn default_success() -> bool {
    true
}

/// A previously persisted draft, in backend shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub completed_sections: BTreeSet<String>,
    #[serde(default)]
    pub phase_index: usize,
    #[serde(default)]
    pub section_index: usize,
}

/// Remote persistence for step saves and drafts.
///
/// Implementations own transport policy (timeouts, retries). They must
/// resolve, never hang: either an acknowledgment or an error value.
#[async_trait]
pub trait StepBackend: Send + Sync {
    /// Submit one section's payload. `draft` saves are marked non-final.
    async fn save_step(
        &self,
        target: &StepTarget,
        payload: &ApiPayload,
        draft: bool,
    ) -> Result<SaveAck, PersistenceError>;

    /// Fetch the latest draft, if the user has one.
    async fn load_draft(&self) -> Result<Option<DraftSnapshot>, PersistenceError>;
}
