//! Form state store: the mutable aggregate of one wizard session.
//!
//! Holds the phase/section pointers, the accumulated values and the
//! completed-section markers. Every mutation is a plain `&mut self` method,
//! so a reader holding a snapshot never observes a half-applied change.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StateError;
use crate::schema::{Phase, SchemaRegistry, SectionRef};

use super::value::{FieldValue, FormValues};

/// Result of [`FormState::advance_section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Moved to the next section of the same phase.
    NextSection(SectionRef),
    /// Crossed into the first section of the next phase.
    NextPhase(SectionRef),
    /// Already at the last section of the last phase; nothing changed.
    Terminal,
}

/// Completion summary for one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseProgress {
    pub slug: String,
    pub title: String,
    pub completed: usize,
    pub total: usize,
}

impl PhaseProgress {
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    pub current_phase_index: usize,
    pub current_section_index: usize,
    #[serde(default)]
    pub values: FormValues,
    #[serde(default)]
    pub completed_section_keys: BTreeSet<String>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> SectionRef {
        SectionRef {
            phase: self.current_phase_index,
            section: self.current_section_index,
        }
    }

    /// Nothing entered, nothing completed, still on the first section.
    pub fn is_pristine(&self) -> bool {
        self.values.is_empty()
            && self.completed_section_keys.is_empty()
            && self.position() == SectionRef::default()
    }

    /// Replace one value. Does not trigger persistence.
    pub fn set_field_value(&mut self, key: impl Into<String>, value: FieldValue) {
        self.values.insert(key, value);
    }

    pub fn value(&self, key: &str) -> &FieldValue {
        self.values.get(key)
    }

    /// Move to the next section, crossing into the next phase when needed.
    /// At the very last section this is a no-op.
    pub fn advance_section(&mut self, registry: &SchemaRegistry) -> AdvanceOutcome {
        let Some(phase) = registry.phase(self.current_phase_index) else {
            return AdvanceOutcome::Terminal;
        };

        if self.current_section_index + 1 < phase.sections.len() {
            self.current_section_index += 1;
            debug!(
                phase = %phase.slug,
                section = self.current_section_index,
                "Advanced to next section"
            );
            return AdvanceOutcome::NextSection(self.position());
        }

        if self.current_phase_index + 1 < registry.phases().len() {
            self.current_phase_index += 1;
            self.current_section_index = 0;
            info!(phase = self.current_phase_index, "Advanced to next phase");
            return AdvanceOutcome::NextPhase(self.position());
        }

        debug!("Advance requested at terminal section, ignoring");
        AdvanceOutcome::Terminal
    }

    /// Idempotently mark a section as completed. Returns `true` if newly added.
    pub fn mark_completed(&mut self, section_key: impl Into<String>) -> bool {
        self.completed_section_keys.insert(section_key.into())
    }

    pub fn is_completed(&self, section_key: &str) -> bool {
        self.completed_section_keys.contains(section_key)
    }

    /// Jump within the current phase.
    ///
    /// Going backward (or staying put) is always allowed; going forward only
    /// to a section that has already been completed.
    pub fn jump_to_section(&mut self, index: usize, phase: &Phase) -> Result<(), StateError> {
        let target = phase
            .sections
            .get(index)
            .ok_or_else(|| StateError::SectionOutOfRange {
                phase: phase.slug.clone(),
                index,
            })?;

        if index > self.current_section_index && !self.is_completed(&target.key) {
            return Err(StateError::SectionNotCompleted(target.key.clone()));
        }

        self.current_section_index = index;
        debug!(phase = %phase.slug, section = %target.key, "Jumped to section");
        Ok(())
    }

    /// Step back one section, crossing into the previous phase's last
    /// section when at the start of a phase.
    pub fn go_back(&mut self, registry: &SchemaRegistry) -> Result<SectionRef, StateError> {
        if self.current_section_index > 0 {
            self.current_section_index -= 1;
            return Ok(self.position());
        }
        if self.current_phase_index == 0 {
            return Err(StateError::AlreadyAtStart);
        }
        let previous = self.current_phase_index - 1;
        let Some(phase) = registry.phase(previous) else {
            return Err(StateError::AlreadyAtStart);
        };
        self.current_phase_index = previous;
        self.current_section_index = phase.sections.len().saturating_sub(1);
        Ok(self.position())
    }

    /// Merge values from a persisted draft. Keys already present in this
    /// session are kept. Returns how many values were adopted.
    pub fn hydrate(&mut self, draft: FormValues) -> usize {
        let mut adopted = 0;
        for (key, value) in draft.iter() {
            if !self.values.contains_key(key) {
                self.values.insert(key.clone(), value.clone());
                adopted += 1;
            }
        }
        adopted
    }

    /// Hydrate from a full draft snapshot. Pointers and completed markers
    /// are only taken over when this session has not started yet.
    pub fn hydrate_from(&mut self, draft: FormState) -> usize {
        if self.is_pristine() {
            self.current_phase_index = draft.current_phase_index;
            self.current_section_index = draft.current_section_index;
            self.completed_section_keys = draft.completed_section_keys;
        }
        self.hydrate(draft.values)
    }

    /// Apply values acknowledged by the server. The server wins on conflict.
    pub fn reconcile(&mut self, acknowledged: FormValues) {
        for (key, value) in acknowledged.iter() {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn progress(&self, registry: &SchemaRegistry) -> Vec<PhaseProgress> {
        registry
            .phases()
            .iter()
            .map(|phase| PhaseProgress {
                slug: phase.slug.clone(),
                title: phase.title.clone(),
                completed: phase
                    .sections
                    .iter()
                    .filter(|s| self.is_completed(&s.key))
                    .count(),
                total: phase.sections.len(),
            })
            .collect()
    }
}
