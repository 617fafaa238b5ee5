//! Persistence boundary: the step backend trait and its implementations.

pub mod http;
pub mod memory;
pub mod traits;

pub use http::HttpBackend;
pub use memory::{MemoryBackend, RecordedSave};
pub use traits::{DraftSnapshot, SaveAck, StepBackend, StepTarget};
