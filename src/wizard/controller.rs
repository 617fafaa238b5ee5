//! WizardController: orchestrates validate → persist → advance over the
//! wizard's sections and phases.
//!
//! The controller is the single writer of a session's [`FormState`]. The
//! store is only changed from a server acknowledgment, never optimistically,
//! so a failed save leaves every pointer and value exactly as it was.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, PersistenceError, StateError};
use crate::form::{
    AdvanceOutcome, FieldValue, FormState, FormValues, PhaseProgress, RealtimePass,
    RealtimeValidator, ValidationResult, validate_section, visible_fields,
};
use crate::mapping::{
    MappingTable, UserContext, from_api_payload, map_field_errors, to_api_payload,
};
use crate::persistence::{StepBackend, StepTarget};
use crate::schema::{
    FieldDefinition, ReferenceData, ResolvedOption, SchemaRegistry, Section, SectionRef,
};

use super::progression::ProgressionState;

/// What a "next" action ended in.
#[derive(Debug, Clone, PartialEq)]
pub enum NextOutcome {
    /// Local validation failed; nothing was sent.
    Invalid(ValidationResult),
    /// The server refused or could not be reached; nothing changed locally.
    SaveFailed {
        message: String,
        errors: ValidationResult,
    },
    /// Saved and moved on.
    Advanced(SectionRef),
    /// Saved; the section's completion message must be acknowledged
    /// before moving on.
    AwaitingAcknowledgement { message: String },
    /// Saved the very last section.
    Terminal,
    /// The action is not allowed right now and was ignored.
    Ignored(StateError),
}

type SharedNext = Shared<BoxFuture<'static, NextOutcome>>;
type SharedDraft = Shared<BoxFuture<'static, Result<(), PersistenceError>>>;

pub struct WizardController {
    registry: Arc<SchemaRegistry>,
    backend: Arc<dyn StepBackend>,
    table: MappingTable,
    reference: ReferenceData,
    user: UserContext,
    state: RwLock<FormState>,
    progression: Mutex<ProgressionState>,
    errors: RwLock<ValidationResult>,
    pending_message: RwLock<Option<String>>,
    flights: Mutex<HashMap<String, SharedNext>>,
    drafts: Mutex<HashMap<String, SharedDraft>>,
    realtime: Arc<RealtimeValidator>,
}

impl WizardController {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        backend: Arc<dyn StepBackend>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            registry,
            backend,
            table: MappingTable::onboarding(),
            reference: ReferenceData::default(),
            user: UserContext::default(),
            state: RwLock::new(FormState::new()),
            progression: Mutex::new(ProgressionState::Idle),
            errors: RwLock::new(ValidationResult::new()),
            pending_message: RwLock::new(None),
            flights: Mutex::new(HashMap::new()),
            drafts: Mutex::new(HashMap::new()),
            realtime: RealtimeValidator::new(config.debounce),
        }
    }

    pub fn with_table(mut self, table: MappingTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_reference(mut self, reference: ReferenceData) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user = user;
        self
    }

    /// Start from an existing session instead of an empty one.
    pub fn with_state(mut self, state: FormState) -> Self {
        self.state = RwLock::new(state);
        self
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// A settled copy of the session.
    pub async fn snapshot(&self) -> FormState {
        self.state.read().await.clone()
    }

    pub async fn position(&self) -> SectionRef {
        self.state.read().await.position()
    }

    pub async fn current_section(&self) -> Option<Section> {
        let at = self.position().await;
        self.registry.section(at).cloned()
    }

    /// Fields of the current section the renderer should show right now.
    pub async fn visible_fields(&self) -> Vec<FieldDefinition> {
        let state = self.state.read().await;
        match self.registry.section(state.position()) {
            Some(section) => visible_fields(section, &state.values).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Errors from the last gating validation or save of this section.
    pub async fn errors(&self) -> ValidationResult {
        self.errors.read().await.clone()
    }

    pub async fn progression(&self) -> ProgressionState {
        *self.progression.lock().await
    }

    pub async fn pending_message(&self) -> Option<String> {
        self.pending_message.read().await.clone()
    }

    pub async fn progress(&self) -> Vec<PhaseProgress> {
        self.state.read().await.progress(&self.registry)
    }

    /// Options for a select field, with dynamic sources resolved.
    pub fn resolve_options(&self, field_key: &str) -> Vec<ResolvedOption> {
        self.registry
            .field(field_key)
            .and_then(|f| f.options.as_ref())
            .map(|options| self.reference.resolve(options))
            .unwrap_or_default()
    }

    /// Inline validation hints, one message per debounced pass.
    pub fn subscribe_hints(&self) -> broadcast::Receiver<RealtimePass> {
        self.realtime.subscribe()
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Record a value change from the renderer and schedule an inline
    /// validation pass for the current section.
    ///
    /// Keys the schema does not define are refused.
    pub async fn set_field_value(&self, key: &str, value: FieldValue) -> Result<(), StateError> {
        if self.registry.field(key).is_none() {
            warn!(field = %key, "Rejected value for unknown field");
            return Err(StateError::UnknownField(key.to_string()));
        }
        let (section, values) = {
            let mut state = self.state.write().await;
            state.set_field_value(key, value);
            let section = self
                .registry
                .section(state.position())
                .filter(|s| s.get_field(key).is_some())
                .cloned();
            (section, state.values.clone())
        };
        if let Some(section) = section {
            self.realtime.schedule(&section, values).await;
        }
        Ok(())
    }

    /// Validate, save and advance the current section.
    ///
    /// Calls made while a "next" for the same section is still running
    /// join that run instead of issuing another save.
    pub async fn next(self: &Arc<Self>) -> NextOutcome {
        let Some(section) = self.current_section().await else {
            return NextOutcome::Ignored(StateError::AlreadyTerminal);
        };

        let flight = {
            let mut flights = self.flights.lock().await;
            if let Some(existing) = flights.get(&section.key) {
                debug!(section = %section.key, "Joining in-flight save");
                existing.clone()
            } else {
                let this = Arc::clone(self);
                let key = section.key.clone();
                let flight = async move {
                    let outcome = this.run_next(&key).await;
                    this.flights.lock().await.remove(&key);
                    outcome
                }
                .boxed()
                .shared();
                flights.insert(section.key.clone(), flight.clone());
                flight
            }
        };
        flight.await
    }

    async fn run_next(&self, section_key: &str) -> NextOutcome {
        if let Err(e) = self.transition(ProgressionState::Validating).await {
            return NextOutcome::Ignored(e);
        }

        let snapshot = self.snapshot().await;
        let at = snapshot.position();
        let (Some(phase), Some(section)) =
            (self.registry.phase(at.phase), self.registry.section(at))
        else {
            warn!(section = %section_key, "No current section to save");
            self.force(ProgressionState::Idle).await;
            return NextOutcome::Ignored(StateError::AlreadyTerminal);
        };

        let result = validate_section(section, &snapshot.values);
        if !result.is_valid() {
            info!(section = %section.key, errors = result.len(), "Section failed validation");
            *self.errors.write().await = result.clone();
            self.realtime.surface(&section.key, result.clone()).await;
            self.force(ProgressionState::Idle).await;
            return NextOutcome::Invalid(result);
        }

        self.errors.write().await.clear();
        self.force(ProgressionState::Saving).await;
        let target = StepTarget {
            phase: phase.slug.clone(),
            step: self.registry.step_number(at).unwrap_or(1),
        };
        let section_values = snapshot
            .values
            .subset(visible_fields(section, &snapshot.values).map(|f| f.key.as_str()));
        let payload = to_api_payload(&section_values, &self.table, &self.user);

        match self.backend.save_step(&target, &payload, false).await {
            Err(e) => {
                let errors = self.record_failure(&section.key, &e).await;
                self.force(ProgressionState::Idle).await;
                NextOutcome::SaveFailed {
                    message: e.user_message(),
                    errors,
                }
            }
            Ok(ack) => {
                self.force(ProgressionState::Advancing).await;
                let acknowledged = from_api_payload(&ack.server_echoed_data, &self.table);
                {
                    let mut state = self.state.write().await;
                    state.reconcile(acknowledged);
                    state.mark_completed(section.key.clone());
                }
                self.errors.write().await.clear();
                self.realtime.reset(&section.key).await;
                info!(
                    phase = %target.phase,
                    step = target.step,
                    section = %section.key,
                    "Section saved"
                );

                match &section.congrats_message {
                    Some(message) => {
                        *self.pending_message.write().await = Some(message.clone());
                        self.force(ProgressionState::AwaitingAcknowledgement).await;
                        NextOutcome::AwaitingAcknowledgement {
                            message: message.clone(),
                        }
                    }
                    None => self.finish_advance().await,
                }
            }
        }
    }

    /// Dismiss the completion message and move on.
    pub async fn acknowledge_completion(&self) -> Result<NextOutcome, StateError> {
        {
            let mut progression = self.progression.lock().await;
            if *progression != ProgressionState::AwaitingAcknowledgement {
                return Err(StateError::NothingToAcknowledge);
            }
            *progression = ProgressionState::Advancing;
        }
        self.pending_message.write().await.take();
        Ok(self.finish_advance().await)
    }

    async fn finish_advance(&self) -> NextOutcome {
        let outcome = self.state.write().await.advance_section(&self.registry);
        match outcome {
            AdvanceOutcome::NextSection(at) | AdvanceOutcome::NextPhase(at) => {
                self.force(ProgressionState::Idle).await;
                NextOutcome::Advanced(at)
            }
            AdvanceOutcome::Terminal => {
                info!("Wizard complete");
                self.force(ProgressionState::Terminal).await;
                NextOutcome::Terminal
            }
        }
    }

    /// Save the current section as a draft. Never validates, never
    /// advances, and is never skipped as a duplicate of an earlier save.
    ///
    /// A draft requested while another draft of the same section is still
    /// running joins that save.
    pub async fn save_draft(self: &Arc<Self>) -> Result<(), Error> {
        let Some(section) = self.current_section().await else {
            return Err(StateError::AlreadyTerminal.into());
        };

        let flight = {
            let mut drafts = self.drafts.lock().await;
            if let Some(existing) = drafts.get(&section.key) {
                debug!(section = %section.key, "Joining in-flight draft save");
                existing.clone()
            } else {
                self.begin_draft(&section.key).await?;
                let this = Arc::clone(self);
                let key = section.key.clone();
                let flight = async move {
                    let outcome = this.run_draft().await;
                    this.drafts.lock().await.remove(&key);
                    outcome
                }
                .boxed()
                .shared();
                drafts.insert(section.key.clone(), flight.clone());
                flight
            }
        };
        Ok(flight.await?)
    }

    async fn begin_draft(&self, section_key: &str) -> Result<(), StateError> {
        let mut progression = self.progression.lock().await;
        if progression.is_busy() {
            return Err(StateError::SaveInFlight(section_key.to_string()));
        }
        if !progression.can_transition_to(ProgressionState::Saving) {
            return Err(StateError::InvalidTransition {
                current: progression.to_string(),
                action: "save a draft".into(),
            });
        }
        *progression = ProgressionState::Saving;
        Ok(())
    }

    async fn run_draft(&self) -> Result<(), PersistenceError> {
        let snapshot = self.snapshot().await;
        let at = snapshot.position();
        let (Some(phase), Some(section)) =
            (self.registry.phase(at.phase), self.registry.section(at))
        else {
            self.force(ProgressionState::Idle).await;
            return Ok(());
        };

        let target = StepTarget {
            phase: phase.slug.clone(),
            step: self.registry.step_number(at).unwrap_or(1),
        };
        let section_values = snapshot
            .values
            .subset(visible_fields(section, &snapshot.values).map(|f| f.key.as_str()));
        let payload = to_api_payload(&section_values, &self.table, &self.user);

        let result = self.backend.save_step(&target, &payload, true).await;
        let outcome = match result {
            Ok(ack) => {
                let acknowledged = from_api_payload(&ack.server_echoed_data, &self.table);
                self.state.write().await.reconcile(acknowledged);
                info!(
                    phase = %target.phase,
                    step = target.step,
                    section = %section.key,
                    "Draft saved"
                );
                Ok(())
            }
            Err(e) => {
                self.record_failure(&section.key, &e).await;
                Err(e)
            }
        };
        self.force(ProgressionState::Idle).await;
        outcome
    }

    /// Step back one section.
    pub async fn go_back(&self) -> Result<SectionRef, StateError> {
        self.require_idle("go back").await?;
        let at = self.state.write().await.go_back(&self.registry)?;
        self.errors.write().await.clear();
        Ok(at)
    }

    /// Jump to a section of the current phase.
    pub async fn jump_to_section(&self, index: usize) -> Result<(), StateError> {
        self.require_idle("jump").await?;
        let mut state = self.state.write().await;
        let Some(phase) = self.registry.phase(state.current_phase_index) else {
            return Err(StateError::AlreadyTerminal);
        };
        state.jump_to_section(index, phase)?;
        drop(state);
        self.errors.write().await.clear();
        Ok(())
    }

    /// Hydrate the session from the server's draft. Values already entered
    /// in this session win. Returns how many values were adopted.
    pub async fn resume(&self) -> Result<usize, PersistenceError> {
        let Some(draft) = self.backend.load_draft().await? else {
            debug!("No draft to resume");
            return Ok(0);
        };

        let mut restored = FormState {
            current_phase_index: draft.phase_index,
            current_section_index: draft.section_index,
            values: from_api_payload(&draft.data, &self.table),
            completed_section_keys: draft.completed_sections,
        };
        if self.registry.section(restored.position()).is_none() {
            warn!(
                phase = restored.current_phase_index,
                section = restored.current_section_index,
                "Draft points at a missing section, starting from the beginning"
            );
            restored.current_phase_index = 0;
            restored.current_section_index = 0;
        }

        let adopted = self.state.write().await.hydrate_from(restored);
        info!(adopted, "Resumed from draft");
        Ok(adopted)
    }

    // ── Helpers ─────────────────────────────────────────────────────

    async fn transition(&self, target: ProgressionState) -> Result<(), StateError> {
        let mut progression = self.progression.lock().await;
        if progression.is_terminal() {
            return Err(StateError::AlreadyTerminal);
        }
        if !progression.can_transition_to(target) {
            warn!(current = %progression, target = %target, "Rejected controller transition");
            return Err(StateError::InvalidTransition {
                current: progression.to_string(),
                action: target.to_string(),
            });
        }
        *progression = target;
        Ok(())
    }

    /// Move along an edge the caller has already established as valid.
    async fn force(&self, target: ProgressionState) {
        let mut progression = self.progression.lock().await;
        debug!(from = %progression, to = %target, "Controller transition");
        *progression = target;
    }

    async fn require_idle(&self, action: &str) -> Result<(), StateError> {
        let progression = self.progression.lock().await;
        if *progression != ProgressionState::Idle {
            return Err(StateError::InvalidTransition {
                current: progression.to_string(),
                action: action.to_string(),
            });
        }
        Ok(())
    }

    /// Merge server field errors over the local result for this section.
    async fn record_failure(
        &self,
        section_key: &str,
        error: &PersistenceError,
    ) -> ValidationResult {
        warn!(section = %section_key, error = %error, "Save failed");
        let mut errors = self.errors.write().await;
        if let Some(field_errors) = error.field_errors() {
            errors.merge(map_field_errors(field_errors, &self.table));
        }
        errors.clone()
    }
}

/// Values of the current section only, for renderers that want a
/// section-scoped view.
pub fn section_values(section: &Section, values: &FormValues) -> FormValues {
    values.subset(section.fields.iter().map(|f| f.key.as_str()))
}
