//! Field mapping layer between the form engine and the persistence API.

pub mod payload;
pub mod table;
pub mod transform;

pub use payload::{ApiPayload, FilePart, WireEncoding, detect_encoding};
pub use table::{Coercion, FieldMapping, MappingTable};
pub use transform::{
    UserContext, from_api_payload, map_field_errors, normalize_date, to_api_payload,
};
