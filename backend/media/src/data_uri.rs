//! Data-URI decoding for editor image payloads.
//!
//! Accepts exactly `data:image/<ext>;base64,<data>`. Every deviation from that
//! grammar is reported as a [`DataUriError`] before any bytes are decoded.

use std::sync::LazyLock;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use regex::Regex;
use thiserror::Error;

use crate::mime_detect::mime_for_extension;

static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.+-]*$").unwrap());

const SCHEME: &str = "data:";
const IMAGE_PREFIX: &str = "image/";
const BASE64_MARKER: &str = ";base64";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("payload is not a data URI")]
    NotADataUri,

    #[error("data URI has no ',' separator")]
    MissingSeparator,

    #[error("data URI is not base64 encoded (missing ';base64' marker)")]
    MissingBase64Marker,

    #[error("data URI media type \"{0}\" is not an image")]
    NotAnImage(String),

    #[error("invalid image extension \"{0}\"")]
    InvalidExtension(String),

    #[error("data URI carries no image data")]
    EmptyPayload,

    #[error("invalid base64 image data: {0}")]
    InvalidBase64(String),
}

/// An image decoded from a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Extension exactly as declared in the URI, e.g. `png` or `svg+xml`.
    pub extension: String,
    pub bytes: Bytes,
}

impl DecodedImage {
    pub fn mime_type(&self) -> &'static str {
        mime_for_extension(&self.extension)
    }
}

/// Parse and decode a `data:image/<ext>;base64,<data>` string.
pub fn decode_image_data_uri(input: &str) -> Result<DecodedImage, DataUriError> {
    let rest = input.strip_prefix(SCHEME).ok_or(DataUriError::NotADataUri)?;
    let (header, data) = rest.split_once(',').ok_or(DataUriError::MissingSeparator)?;

    let media_type = header
        .strip_suffix(BASE64_MARKER)
        .ok_or(DataUriError::MissingBase64Marker)?;
    let extension = media_type
        .strip_prefix(IMAGE_PREFIX)
        .ok_or_else(|| DataUriError::NotAnImage(media_type.to_string()))?;
    if !EXTENSION_RE.is_match(extension) {
        return Err(DataUriError::InvalidExtension(extension.to_string()));
    }

    // Browsers may wrap long payloads; whitespace is not part of the alphabet.
    let data: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if data.is_empty() {
        return Err(DataUriError::EmptyPayload);
    }
    let bytes = STANDARD
        .decode(data.as_bytes())
        .map_err(|e| DataUriError::InvalidBase64(e.to_string()))?;

    Ok(DecodedImage {
        extension: extension.to_string(),
        bytes: Bytes::from(bytes),
    })
}

/// Build a `data:image/<ext>;base64,<data>` string from raw bytes.
pub fn encode_image_data_uri(extension: &str, bytes: &[u8]) -> String {
    format!("{SCHEME}{IMAGE_PREFIX}{extension}{BASE64_MARKER},{}", STANDARD.encode(bytes))
}
