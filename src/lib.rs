//! Onboard Wizard: schema-driven multi-phase onboarding form engine.

pub mod config;
pub mod error;
pub mod form;
pub mod mapping;
pub mod persistence;
pub mod schema;
pub mod wizard;

pub use error::{Error, Result};
