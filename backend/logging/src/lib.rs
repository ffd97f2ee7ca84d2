//! Structured logging components for richdoc.
//!
//! Handles log redaction, JSON file output, and upload audit events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{UploadEvent, UploadEventEntry, UploadEventLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
