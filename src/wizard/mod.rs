//! Progression controller: drives a session through validate → persist →
//! advance.

pub mod controller;
pub mod progression;

pub use controller::{NextOutcome, WizardController, section_values};
pub use progression::ProgressionState;
