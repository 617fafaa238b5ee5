//! Debounced real-time validation for inline hints.
//!
//! Every value change schedules a pass for its section; a newer change for
//! the same section cancels the pending pass before scheduling its own, so
//! at most one pass per section is ever pending. Results are broadcast to
//! subscribers and never gate advancement.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::schema::Section;

use super::validation::{REQUIRED_MESSAGE, ValidationResult, validate_field};
use super::value::FormValues;
use super::visibility::visible_fields;

const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// One completed real-time pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimePass {
    pub section_key: String,
    pub result: ValidationResult,
}

#[derive(Default)]
struct SectionSlot {
    generation: u64,
    pending: Option<JoinHandle<()>>,
    /// Errors currently shown inline for this section.
    surfaced: ValidationResult,
}

/// Per-section debounced validator.
pub struct RealtimeValidator {
    delay: Duration,
    slots: Mutex<HashMap<String, SectionSlot>>,
    passes: AtomicU64,
    tx: broadcast::Sender<RealtimePass>,
}

impl RealtimeValidator {
    pub fn new(delay: Duration) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            delay,
            slots: Mutex::new(HashMap::new()),
            passes: AtomicU64::new(0),
            tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimePass> {
        self.tx.subscribe()
    }

    /// Total number of passes that have run.
    pub fn pass_count(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// Schedule a pass over `values` once input for `section` has been idle
    /// for the configured delay, replacing any pass already pending.
    pub async fn schedule(self: &Arc<Self>, section: &Section, values: FormValues) {
        let key = section.key.clone();
        let mut slots = self.slots.lock().await;
        let slot = slots.entry(key.clone()).or_default();

        if let Some(previous) = slot.pending.take() {
            previous.abort();
            debug!(section = %key, "Cancelled pending validation pass");
        }
        slot.generation += 1;
        let generation = slot.generation;

        let this = Arc::clone(self);
        let section = section.clone();
        slot.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(this.delay).await;
            this.run_pass(&section, &values, generation).await;
        }));
    }

    async fn run_pass(&self, section: &Section, values: &FormValues, generation: u64) {
        let result = {
            let mut slots = self.slots.lock().await;
            let Some(slot) = slots.get_mut(&section.key) else {
                return;
            };
            if slot.generation != generation {
                return;
            }
            let result = partial_validate(section, values, &slot.surfaced);
            slot.surfaced = result.clone();
            slot.pending = None;
            result
        };

        self.passes.fetch_add(1, Ordering::SeqCst);
        debug!(section = %section.key, errors = result.len(), "Real-time validation pass");
        let _ = self.tx.send(RealtimePass {
            section_key: section.key.clone(),
            result,
        });
    }

    /// Cancel the pending pass for a section, if any.
    pub async fn cancel(&self, section_key: &str) -> bool {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(section_key) else {
            return false;
        };
        slot.generation += 1;
        match slot.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Replace the inline errors for a section, e.g. after a gating
    /// validation run surfaced `required` errors.
    pub async fn surface(&self, section_key: &str, result: ValidationResult) {
        let mut slots = self.slots.lock().await;
        slots.entry(section_key.to_string()).or_default().surfaced = result;
    }

    /// Errors currently shown inline for a section.
    pub async fn surfaced(&self, section_key: &str) -> ValidationResult {
        let slots = self.slots.lock().await;
        slots
            .get(section_key)
            .map(|s| s.surfaced.clone())
            .unwrap_or_default()
    }

    /// Forget a section entirely, cancelling anything pending.
    pub async fn reset(&self, section_key: &str) {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.remove(section_key) {
            if let Some(handle) = slot.pending {
                handle.abort();
            }
        }
    }

    pub async fn has_pending(&self, section_key: &str) -> bool {
        let slots = self.slots.lock().await;
        slots
            .get(section_key)
            .is_some_and(|s| s.pending.is_some())
    }
}

/// Validation for inline hints.
///
/// Non-empty fields are checked with the full rule set. Empty fields never
/// raise a new `required` error, but one already shown stays while the
/// field remains empty.
pub fn partial_validate(
    section: &Section,
    values: &FormValues,
    previous: &ValidationResult,
) -> ValidationResult {
    let mut result = ValidationResult::new();
    for field in visible_fields(section, values) {
        let value = values.get(&field.key);
        if value.is_empty() {
            if field.validation.required && previous.get(&field.key) == Some(REQUIRED_MESSAGE) {
                result.insert(field.key.clone(), REQUIRED_MESSAGE);
            }
            continue;
        }
        if let Some(message) = validate_field(field, value) {
            result.insert(field.key.clone(), message);
        }
    }
    result
}
