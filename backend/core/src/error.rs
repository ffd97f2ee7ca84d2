use std::fmt;

use thiserror::Error;

use crate::types::{DocumentId, FolderId};

/// Failures reported by a document store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("folder {0} does not exist")]
    FolderNotFound(FolderId),

    #[error("document {0} does not exist")]
    DocumentNotFound(DocumentId),

    #[error("a document named \"{name}\" already exists in folder {folder}")]
    DuplicateName { name: String, folder: FolderId },

    #[error("document store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(err: impl fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Pipeline step of an image upload, used for logging and audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    /// Payload field extraction and data-URI decoding.
    Validate,
    Upload,
    Rename,
    Finalize,
}

impl UploadStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Upload => "upload",
            Self::Rename => "rename",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the image upload pipeline.
///
/// Store variants display the underlying store message verbatim; that text is
/// what the editor shows to the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("{0}")]
    StoreUpload(String),

    #[error("{0}")]
    StoreUpdate(String),

    #[error("{0}")]
    StoreFinalize(String),
}

impl UploadError {
    pub fn step(&self) -> UploadStep {
        match self {
            Self::MalformedRequest(_) => UploadStep::Validate,
            Self::StoreUpload(_) => UploadStep::Upload,
            Self::StoreUpdate(_) => UploadStep::Rename,
            Self::StoreFinalize(_) => UploadStep::Finalize,
        }
    }

    /// Whether the failure happened after the document was created.
    pub fn leaves_document(&self) -> bool {
        matches!(self, Self::StoreUpdate(_) | Self::StoreFinalize(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_variants_keep_message_verbatim() {
        let err = UploadError::StoreUpload(StoreError::FolderNotFound(FolderId(9)).to_string());
        assert_eq!(err.to_string(), "folder 9 does not exist");
    }

    #[test]
    fn only_post_upload_failures_leave_a_document() {
        assert!(!UploadError::MalformedRequest("x".into()).leaves_document());
        assert!(!UploadError::StoreUpload("x".into()).leaves_document());
        assert!(UploadError::StoreUpdate("x".into()).leaves_document());
        assert!(UploadError::StoreFinalize("x".into()).leaves_document());
    }
}
