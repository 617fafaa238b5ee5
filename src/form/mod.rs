//! Form engine: values, visibility, validation and the session store.

pub mod realtime;
pub mod state;
pub mod validation;
pub mod value;
pub mod visibility;

pub use realtime::{RealtimePass, RealtimeValidator, partial_validate};
pub use state::{AdvanceOutcome, FormState, PhaseProgress};
pub use validation::{REQUIRED_MESSAGE, ValidationResult, validate_field, validate_section};
pub use value::{
    AllowOtherValue, CompositeValue, FieldValue, FileHandle, FormValues, ProjectRow, Selection,
};
pub use visibility::{is_visible, visible_fields};
