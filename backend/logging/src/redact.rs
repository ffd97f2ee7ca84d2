//! Log Redaction Layer
//!
//! Scrubs embedded image data and bearer tokens from strings prior to logging.
//! Upload payloads can be megabytes of base64; only their header is kept.

use regex::Regex;
use std::sync::LazyLock;

static DATA_URI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(data:[A-Za-z0-9.+/-]*(?:;[A-Za-z0-9=-]+)*,)[A-Za-z0-9+/=\s]+").unwrap());
static LONG_BASE64_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/]{64,}={0,2}").unwrap());
static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());

/// Redacts sensitive or bulky patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let mut redacted = DATA_URI_RE.replace_all(input, "${1}[REDACTED_DATA]").to_string();

    redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]").to_string();

    // Bare base64 runs, e.g. from a payload without its data: header.
    redacted = LONG_BASE64_RE.replace_all(&redacted, "[REDACTED_DATA]").to_string();

    redacted
}
