//! Upload Event Logger
//!
//! Structured audit events for image uploads, emitted on the `upload_events`
//! tracing target so they can be routed to the NDJSON file layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UploadEvent {
    Stored {
        doc_id: i64,
        folder_id: i64,
        extension: String,
        size_bytes: usize,
    },
    Failed {
        step: String,
        folder_id: Option<i64>,
        doc_id: Option<i64>,
        error_msg: String,
    },
    CleanedUp {
        doc_id: i64,
    },
}

#[derive(Debug, Serialize)]
pub struct UploadEventEntry {
    pub template_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: UploadEvent,
}

pub struct UploadEventLogger;

impl UploadEventLogger {
    /// Builds the audit entry for an event, redacting any free-form text.
    pub fn entry(template_id: &str, mut event: UploadEvent) -> UploadEventEntry {
        if let UploadEvent::Failed { error_msg, .. } = &mut event {
            *error_msg = redact_sensitive_data(error_msg);
        }
        UploadEventEntry {
            template_id: template_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }

    pub fn log_event(template_id: &str, event: UploadEvent) {
        let entry = Self::entry(template_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_default();
        match entry.event {
            UploadEvent::Failed { .. } => warn!(target: "upload_events", event = %json, "Upload event"),
            _ => info!(target: "upload_events", event = %json, "Upload event"),
        }
    }
}
