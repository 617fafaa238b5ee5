//! Progression state machine: where the controller is in the
//! validate → persist → advance cycle.

use serde::{Deserialize, Serialize};

/// Controller states.
///
/// A "next" runs Idle → Validating → Saving → Advancing and then lands in
/// Idle, AwaitingAcknowledgement (section has a completion message) or
/// Terminal. A draft save runs Idle → Saving → Idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionState {
    #[default]
    Idle,
    Validating,
    Saving,
    Advancing,
    AwaitingAcknowledgement,
    Terminal,
}

impl ProgressionState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: ProgressionState) -> bool {
        use ProgressionState::*;
        matches!(
            (self, target),
            (Idle, Validating)
                | (Idle, Saving)
                | (Validating, Idle)
                | (Validating, Saving)
                | (Saving, Advancing)
                | (Saving, Idle)
                | (Advancing, AwaitingAcknowledgement)
                | (Advancing, Idle)
                | (Advancing, Terminal)
                | (AwaitingAcknowledgement, Advancing)
        )
    }

    /// Whether the wizard is finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }

    /// Whether a save or validation is underway.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Validating | Self::Saving | Self::Advancing)
    }
}

impl std::fmt::Display for ProgressionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Saving => "saving",
            Self::Advancing => "advancing",
            Self::AwaitingAcknowledgement => "awaiting_acknowledgement",
            Self::Terminal => "terminal",
        };
        write!(f, "{s}")
    }
}
