use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the document store to a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub i64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a folder (container) in the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(pub i64);

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A folder in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub parent_id: Option<FolderId>,
}

/// How the store treats a document name that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniquenessPolicy {
    /// Duplicate names are allowed.
    #[default]
    None,
    /// Reject a name already used by another document in the same folder.
    ForParent,
}

/// Document columns that can be written by a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentField {
    Name,
    Extension,
}

/// A document record before it has been uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub name: String,
    pub extension: String,
    pub parent_folder_id: FolderId,
}

impl NewDocument {
    pub fn new(name: impl Into<String>, extension: impl Into<String>, parent: FolderId) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            parent_folder_id: parent,
        }
    }
}

/// The current version of a stored document.
///
/// `size_bytes` stays `None` until the store has been asked to finalize the
/// size from the uploaded content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub name: String,
    pub extension: String,
    pub parent_folder_id: FolderId,
    pub size_bytes: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// File name as served to clients, e.g. `Image 12.png`.
    pub fn file_name(&self) -> String {
        if self.extension.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }
}

/// Typed form of the rich-text editor's upload payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// `data:image/<ext>;base64,<data>`
    pub base64: String,
    #[serde(rename = "imageDestinationFolder")]
    pub image_destination_folder: FolderId,
}

/// Outcome returned to the editor: `{"docId": n}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadResult {
    #[serde(rename = "docId")]
    DocId(DocumentId),
    #[serde(rename = "error")]
    Error(String),
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::DocId(_))
    }

    pub fn doc_id(&self) -> Option<DocumentId> {
        match self {
            Self::DocId(id) => Some(*id),
            Self::Error(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upload_result_wire_shape() {
        let ok = serde_json::to_value(UploadResult::DocId(DocumentId(42))).unwrap();
        assert_eq!(ok, json!({ "docId": 42 }));

        let err = serde_json::to_value(UploadResult::Error("boom".into())).unwrap();
        assert_eq!(err, json!({ "error": "boom" }));
    }

    #[test]
    fn upload_request_reads_editor_field_names() {
        let req: UploadRequest = serde_json::from_value(json!({
            "base64": "data:image/png;base64,aGVsbG8=",
            "imageDestinationFolder": 7
        }))
        .unwrap();
        assert_eq!(req.image_destination_folder, FolderId(7));
    }

    #[test]
    fn upload_request_rejects_non_integer_folder() {
        let res: Result<UploadRequest, _> = serde_json::from_value(json!({
            "base64": "data:image/png;base64,aGVsbG8=",
            "imageDestinationFolder": "seven"
        }));
        assert!(res.is_err());
    }

    #[test]
    fn file_name_joins_extension() {
        let now = Utc::now();
        let record = DocumentRecord {
            id: DocumentId(3),
            name: "Image 3".into(),
            extension: "png".into(),
            parent_folder_id: FolderId(1),
            size_bytes: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(record.file_name(), "Image 3.png");
    }
}
