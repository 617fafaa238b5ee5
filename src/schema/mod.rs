//! Schema registry: the declarative description of phases, sections and
//! fields that drives every other part of the engine.

pub mod catalog;
pub mod field;
pub mod reference;
pub mod registry;

pub use catalog::onboarding_schema;
pub use field::{
    Condition, ConditionTarget, DynamicSource, FieldDefinition, FieldKey, FieldType, OTHER_SENTINEL,
    OptionsSource, SelectOption, ValidationRules, WidgetKind,
};
pub use reference::{ReferenceData, ReferenceEntry, ResolvedOption};
pub use registry::{Phase, SchemaRegistry, Section, SectionRef};
