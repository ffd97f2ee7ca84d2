use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;
use crate::types::{
    DocumentField, DocumentId, DocumentRecord, Folder, FolderId, NewDocument, UniquenessPolicy,
};

/// Content repository that persists documents under a folder hierarchy.
///
/// Implementations own their synchronization; callers share them as
/// `Arc<dyn DocumentStore>`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Human-readable backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Create a folder, optionally nested under `parent`.
    async fn create_folder(
        &self,
        name: &str,
        parent: Option<FolderId>,
    ) -> Result<FolderId, StoreError>;

    async fn list_folders(&self) -> Result<Vec<Folder>, StoreError>;

    /// Create a document in `doc.parent_folder_id` and write `content` to it.
    ///
    /// The content is written through a stream that is closed on every exit
    /// path. The stored size is left unset until [`finalize_size`] runs.
    ///
    /// [`finalize_size`]: DocumentStore::finalize_size
    async fn create_and_upload(
        &self,
        doc: NewDocument,
        content: Bytes,
        policy: UniquenessPolicy,
    ) -> Result<DocumentId, StoreError>;

    /// Fetch the current version of a document.
    async fn get_current_version(&self, id: DocumentId) -> Result<DocumentRecord, StoreError>;

    /// Persist only the listed fields of `record`.
    async fn update_fields(
        &self,
        record: &DocumentRecord,
        fields: &[DocumentField],
        policy: UniquenessPolicy,
    ) -> Result<(), StoreError>;

    /// Compute the document's size from its uploaded content and store it.
    async fn finalize_size(&self, id: DocumentId) -> Result<(), StoreError>;

    async fn read_content(&self, id: DocumentId) -> Result<Bytes, StoreError>;

    async fn delete(&self, id: DocumentId) -> Result<(), StoreError>;
}
