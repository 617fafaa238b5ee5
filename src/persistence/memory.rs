//! In-process step backend. Keeps every save it receives and echoes the
//! payload back as the server acknowledgment.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::PersistenceError;
use crate::mapping::{ApiPayload, WireEncoding};

use super::traits::{DraftSnapshot, SaveAck, StepBackend, StepTarget};

/// One save as seen by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSave {
    pub target: StepTarget,
    pub draft: bool,
    pub encoding: WireEncoding,
    pub fields: Map<String, Value>,
    pub file_names: Vec<String>,
}

#[derive(Default)]
struct Inner {
    saves: Vec<RecordedSave>,
    stored: Map<String, Value>,
    draft: Option<DraftSnapshot>,
    failures: VecDeque<PersistenceError>,
    echo_extra: Map<String, Value>,
}

#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every save by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seed the draft returned by [`StepBackend::load_draft`].
    pub fn with_draft(mut self, draft: DraftSnapshot) -> Self {
        self.inner.get_mut().draft = Some(draft);
        self
    }

    /// Fail the next save with `error`. Queued failures are consumed in order.
    pub async fn fail_next(&self, error: PersistenceError) {
        self.inner.lock().await.failures.push_back(error);
    }

    /// Add server-computed fields to every acknowledgment.
    pub async fn echo_extra(&self, key: impl Into<String>, value: Value) {
        self.inner.lock().await.echo_extra.insert(key.into(), value);
    }

    /// Number of `save_step` calls received, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn saves(&self) -> Vec<RecordedSave> {
        self.inner.lock().await.saves.clone()
    }

    /// Everything the backend has accepted so far, merged.
    pub async fn stored(&self) -> Map<String, Value> {
        self.inner.lock().await.stored.clone()
    }
}

#[async_trait]
impl StepBackend for MemoryBackend {
    async fn save_step(
        &self,
        target: &StepTarget,
        payload: &ApiPayload,
        draft: bool,
    ) -> Result<SaveAck, PersistenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut inner = self.inner.lock().await;
        if let Some(error) = inner.failures.pop_front() {
            debug!(phase = %target.phase, step = target.step, "Injected save failure");
            return Err(error);
        }

        inner.saves.push(RecordedSave {
            target: target.clone(),
            draft,
            encoding: payload.encoding,
            fields: payload.fields.clone(),
            file_names: payload.files.iter().map(|f| f.file_name.clone()).collect(),
        });
        for (key, value) in &payload.fields {
            inner.stored.insert(key.clone(), value.clone());
        }

        let mut echoed = payload.fields.clone();
        for (key, value) in &inner.echo_extra {
            echoed.insert(key.clone(), value.clone());
        }
        Ok(SaveAck {
            success: true,
            server_echoed_data: echoed,
        })
    }

    async fn load_draft(&self) -> Result<Option<DraftSnapshot>, PersistenceError> {
        let inner = self.inner.lock().await;
        if let Some(draft) = &inner.draft {
            return Ok(Some(draft.clone()));
        }
        if inner.stored.is_empty() {
            return Ok(None);
        }
        Ok(Some(DraftSnapshot {
            data: inner.stored.clone(),
            ..Default::default()
        }))
    }
}
