//! MIME type detection for stored documents.
//!
//! Used when serving documents back to the editor, where only the stored
//! extension is known.

use std::path::Path;

/// Map a document extension to its MIME type.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        // Images
        "jpg" | "jpeg" | "pjpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "svg" | "svg+xml" => "image/svg+xml",
        "avif"         => "image/avif",
        "bmp"          => "image/bmp",
        "ico" | "x-icon" | "vnd.microsoft.icon" => "image/x-icon",
        "tiff" | "tif" => "image/tiff",

        // Documents
        "pdf"          => "application/pdf",
        "txt"          => "text/plain",

        _              => "application/octet-stream",
    }
}

/// Detect MIME type by file extension of a path.
pub fn detect_mime_type(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .map(mime_for_extension)
        .unwrap_or("application/octet-stream")
}

/// Data-URI extension for a local image file, e.g. `photo.JPG` → `jpeg`.
pub fn data_uri_extension(path: &Path) -> Option<&'static str> {
    match detect_mime_type(path) {
        "image/jpeg" => Some("jpeg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg+xml"),
        "image/avif" => Some("avif"),
        "image/bmp" => Some("bmp"),
        "image/x-icon" => Some("x-icon"),
        "image/tiff" => Some("tiff"),
        _ => None,
    }
}

/// Whether a document is safe to serve inline (not just download).
///
/// SVG is excluded since it can carry script.
pub fn is_inline_safe(mime: &str) -> bool {
    matches!(
        mime,
        "image/jpeg" | "image/png" | "image/gif" | "image/webp" | "image/avif" | "image/bmp"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_jpeg() {
        assert_eq!(detect_mime_type(&PathBuf::from("photo.JPG")), "image/jpeg");
        assert_eq!(data_uri_extension(&PathBuf::from("photo.jpg")), Some("jpeg"));
    }

    #[test]
    fn data_uri_subtypes_map_back() {
        assert_eq!(mime_for_extension("svg+xml"), "image/svg+xml");
        assert_eq!(mime_for_extension("x-icon"), "image/x-icon");
    }

    #[test]
    fn unknown_extension_fallback() {
        assert_eq!(mime_for_extension("xyz"), "application/octet-stream");
        assert_eq!(data_uri_extension(&PathBuf::from("notes.txt")), None);
    }

    #[test]
    fn svg_is_not_inline() {
        assert!(!is_inline_safe("image/svg+xml"));
        assert!(is_inline_safe("image/png"));
    }
}
