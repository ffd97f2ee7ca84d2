use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tracing::debug;

use richdoc_core::{
    DocumentField, DocumentId, DocumentRecord, DocumentStore, Folder, FolderId, NewDocument,
    StoreError, UniquenessPolicy,
};

struct StoredDocument {
    record: DocumentRecord,
    content: Bytes,
}

#[derive(Default)]
struct State {
    last_folder_id: i64,
    last_document_id: i64,
    folders: HashMap<FolderId, Folder>,
    documents: HashMap<DocumentId, StoredDocument>,
}

impl State {
    fn ensure_folder(&self, id: FolderId) -> Result<(), StoreError> {
        if self.folders.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::FolderNotFound(id))
        }
    }

    fn check_unique(
        &self,
        name: &str,
        folder: FolderId,
        except: Option<DocumentId>,
        policy: UniquenessPolicy,
    ) -> Result<(), StoreError> {
        if policy == UniquenessPolicy::None {
            return Ok(());
        }
        let taken = self.documents.values().any(|d| {
            Some(d.record.id) != except
                && d.record.parent_folder_id == folder
                && d.record.name == name
        });
        if taken {
            return Err(StoreError::DuplicateName { name: name.to_string(), folder });
        }
        Ok(())
    }
}

/// Document store kept entirely in process memory.
///
/// Used for tests and for running the gateway without a database
/// (`db_path = ":memory:"`).
#[derive(Default)]
pub struct InMemoryDocumentStore {
    state: RwLock<State>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<FolderId>,
    ) -> Result<FolderId, StoreError> {
        let mut state = self.write()?;
        if let Some(parent) = parent {
            state.ensure_folder(parent)?;
        }
        state.last_folder_id += 1;
        let id = FolderId(state.last_folder_id);
        state.folders.insert(id, Folder { id, name: name.to_string(), parent_id: parent });
        debug!(folder = %id, name, "Folder created");
        Ok(id)
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, StoreError> {
        let state = self.read()?;
        let mut folders: Vec<Folder> = state.folders.values().cloned().collect();
        folders.sort_by_key(|f| f.id);
        Ok(folders)
    }

    async fn create_and_upload(
        &self,
        doc: NewDocument,
        content: Bytes,
        policy: UniquenessPolicy,
    ) -> Result<DocumentId, StoreError> {
        let mut state = self.write()?;
        state.ensure_folder(doc.parent_folder_id)?;
        state.check_unique(&doc.name, doc.parent_folder_id, None, policy)?;

        state.last_document_id += 1;
        let id = DocumentId(state.last_document_id);
        let now = Utc::now();
        let record = DocumentRecord {
            id,
            name: doc.name,
            extension: doc.extension,
            parent_folder_id: doc.parent_folder_id,
            size_bytes: None,
            created_at: now,
            updated_at: now,
        };
        state.documents.insert(id, StoredDocument { record, content });
        Ok(id)
    }

    async fn get_current_version(&self, id: DocumentId) -> Result<DocumentRecord, StoreError> {
        let state = self.read()?;
        state
            .documents
            .get(&id)
            .map(|d| d.record.clone())
            .ok_or(StoreError::DocumentNotFound(id))
    }

    async fn update_fields(
        &self,
        record: &DocumentRecord,
        fields: &[DocumentField],
        policy: UniquenessPolicy,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let folder = state
            .documents
            .get(&record.id)
            .map(|d| d.record.parent_folder_id)
            .ok_or(StoreError::DocumentNotFound(record.id))?;
        if fields.contains(&DocumentField::Name) {
            state.check_unique(&record.name, folder, Some(record.id), policy)?;
        }

        let stored = state
            .documents
            .get_mut(&record.id)
            .ok_or(StoreError::DocumentNotFound(record.id))?;
        for field in fields {
            match field {
                DocumentField::Name => stored.record.name = record.name.clone(),
                DocumentField::Extension => stored.record.extension = record.extension.clone(),
            }
        }
        stored.record.updated_at = Utc::now();
        Ok(())
    }

    async fn finalize_size(&self, id: DocumentId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let stored = state
            .documents
            .get_mut(&id)
            .ok_or(StoreError::DocumentNotFound(id))?;
        stored.record.size_bytes = Some(stored.content.len() as u64);
        stored.record.updated_at = Utc::now();
        Ok(())
    }

    async fn read_content(&self, id: DocumentId) -> Result<Bytes, StoreError> {
        let state = self.read()?;
        state
            .documents
            .get(&id)
            .map(|d| d.content.clone())
            .ok_or(StoreError::DocumentNotFound(id))
    }

    async fn delete(&self, id: DocumentId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state
            .documents
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::DocumentNotFound(id))
    }
}
