use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Row};
use tracing::{debug, info};

use richdoc_core::{
    DocumentField, DocumentId, DocumentRecord, DocumentStore, Folder, FolderId, NewDocument,
    StoreError, UniquenessPolicy,
};

const DOCUMENT_COLUMNS: &str =
    "id, name, extension, parent_folder_id, size_bytes, created_at, updated_at";

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::backend(e)
}

fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let size: Option<i64> = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(DocumentRecord {
        id: DocumentId(row.get(0)?),
        name: row.get(1)?,
        extension: row.get(2)?,
        parent_folder_id: FolderId(row.get(3)?),
        size_bytes: size.map(|s| s as u64),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn ensure_folder(conn: &Connection, id: FolderId) -> Result<(), StoreError> {
    let exists: Option<i64> = conn
        .query_row("SELECT id FROM folders WHERE id = ?1", params![id.0], |row| row.get(0))
        .optional()
        .map_err(db_err)?;
    exists.map(|_| ()).ok_or(StoreError::FolderNotFound(id))
}

fn check_unique(
    conn: &Connection,
    name: &str,
    folder: FolderId,
    except: Option<DocumentId>,
    policy: UniquenessPolicy,
) -> Result<(), StoreError> {
    if policy == UniquenessPolicy::None {
        return Ok(());
    }
    let taken: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM documents
             WHERE parent_folder_id = ?1 AND name = ?2 AND id != ?3",
            params![folder.0, name, except.map_or(-1, |id| id.0)],
            |row| row.get(0),
        )
        .map_err(db_err)?;
    if taken > 0 {
        return Err(StoreError::DuplicateName { name: name.to_string(), folder });
    }
    Ok(())
}

/// Set once the caller stops waiting for a store call.
#[derive(Clone, Default)]
struct Abandoned(Arc<AtomicBool>);

impl Abandoned {
    fn check(&self) -> Result<(), StoreError> {
        if self.0.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store call abandoned by caller".into()));
        }
        Ok(())
    }
}

/// Marks the call abandoned when its future is dropped before completing.
struct AbandonOnDrop {
    flag: Abandoned,
    finished: bool,
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        if !self.finished {
            self.flag.0.store(true, Ordering::SeqCst);
        }
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StoreError> {
    conn.lock()
        .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".into()))
}

/// SQLite-backed document store.
///
/// Content is written with incremental BLOB I/O inside a transaction, so a
/// failed write leaves no document behind. Every call runs on the blocking
/// pool; a call whose caller gave up (e.g. timed out) never commits.
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Open or create the document store at the given path.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        let store = Self { conn: Arc::new(Mutex::new(conn)) };
        store.init_schema()?;
        info!(path = %path, "Document store opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        let store = Self { conn: Arc::new(Mutex::new(conn)) };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        lock(&self.conn)?
            .execute_batch(
                "PRAGMA foreign_keys = ON;
                CREATE TABLE IF NOT EXISTS folders (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    parent_id INTEGER REFERENCES folders(id)
                );
                CREATE TABLE IF NOT EXISTS documents (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    extension TEXT NOT NULL,
                    parent_folder_id INTEGER NOT NULL REFERENCES folders(id),
                    size_bytes INTEGER,
                    content BLOB NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_documents_parent ON documents(parent_folder_id, name);",
            )
            .map_err(db_err)
    }

    /// Run one rusqlite operation on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection, &Abandoned) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let abandoned = Abandoned::default();
        let mut guard = AbandonOnDrop { flag: abandoned.clone(), finished: false };

        let task = tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            abandoned.check()?;
            op(&mut conn, &abandoned)
        });
        let result = task.await.map_err(db_err)?;
        guard.finished = true;
        result
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<FolderId>,
    ) -> Result<FolderId, StoreError> {
        let name = name.to_string();
        self.run(move |conn, _| {
            if let Some(parent) = parent {
                ensure_folder(conn, parent)?;
            }
            conn.execute(
                "INSERT INTO folders (name, parent_id) VALUES (?1, ?2)",
                params![name, parent.map(|p| p.0)],
            )
            .map_err(db_err)?;
            let id = FolderId(conn.last_insert_rowid());
            debug!(folder = %id, name = %name, "Folder created");
            Ok(id)
        })
        .await
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, StoreError> {
        self.run(|conn, _| {
            let mut stmt = conn
                .prepare("SELECT id, name, parent_id FROM folders ORDER BY id ASC")
                .map_err(db_err)?;
            let folders = stmt
                .query_map([], |row| {
                    let parent: Option<i64> = row.get(2)?;
                    Ok(Folder {
                        id: FolderId(row.get(0)?),
                        name: row.get(1)?,
                        parent_id: parent.map(FolderId),
                    })
                })
                .map_err(db_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err)?;
            Ok(folders)
        })
        .await
    }

    async fn create_and_upload(
        &self,
        doc: NewDocument,
        content: Bytes,
        policy: UniquenessPolicy,
    ) -> Result<DocumentId, StoreError> {
        self.run(move |conn, abandoned| {
            let tx = conn.transaction().map_err(db_err)?;
            ensure_folder(&tx, doc.parent_folder_id)?;
            check_unique(&tx, &doc.name, doc.parent_folder_id, None, policy)?;

            let now = Utc::now().to_rfc3339();
            tx.execute(
                "INSERT INTO documents (name, extension, parent_folder_id, size_bytes, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, NULL, zeroblob(?4), ?5, ?5)",
                params![doc.name, doc.extension, doc.parent_folder_id.0, content.len() as i64, now],
            )
            .map_err(db_err)?;
            let row_id = tx.last_insert_rowid();

            // The blob handle is the write stream; dropping it on an error path
            // closes it before the transaction rolls back.
            if !content.is_empty() {
                let mut stream = tx
                    .blob_open(DatabaseName::Main, "documents", "content", row_id, false)
                    .map_err(db_err)?;
                stream.write_all(&content).map_err(db_err)?;
                stream.close().map_err(db_err)?;
            }

            if let Err(e) = abandoned.check() {
                debug!(row_id, "Rolling back upload nobody is waiting for");
                return Err(e);
            }
            tx.commit().map_err(db_err)?;
            Ok(DocumentId(row_id))
        })
        .await
    }

    async fn get_current_version(&self, id: DocumentId) -> Result<DocumentRecord, StoreError> {
        self.run(move |conn, _| {
            conn.query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
                params![id.0],
                document_from_row,
            )
            .optional()
            .map_err(db_err)?
            .ok_or(StoreError::DocumentNotFound(id))
        })
        .await
    }

    async fn update_fields(
        &self,
        record: &DocumentRecord,
        fields: &[DocumentField],
        policy: UniquenessPolicy,
    ) -> Result<(), StoreError> {
        let record = record.clone();
        let fields = fields.to_vec();
        self.run(move |conn, _| {
            let folder: Option<i64> = conn
                .query_row(
                    "SELECT parent_folder_id FROM documents WHERE id = ?1",
                    params![record.id.0],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            let folder = folder.map(FolderId).ok_or(StoreError::DocumentNotFound(record.id))?;

            let now = Utc::now().to_rfc3339();
            for field in fields {
                let updated = match field {
                    DocumentField::Name => {
                        check_unique(conn, &record.name, folder, Some(record.id), policy)?;
                        conn.execute(
                            "UPDATE documents SET name = ?2, updated_at = ?3 WHERE id = ?1",
                            params![record.id.0, record.name, now],
                        )
                    }
                    DocumentField::Extension => conn.execute(
                        "UPDATE documents SET extension = ?2, updated_at = ?3 WHERE id = ?1",
                        params![record.id.0, record.extension, now],
                    ),
                };
                updated.map_err(db_err)?;
            }
            Ok(())
        })
        .await
    }

    async fn finalize_size(&self, id: DocumentId) -> Result<(), StoreError> {
        self.run(move |conn, _| {
            let changed = conn
                .execute(
                    "UPDATE documents SET size_bytes = length(content), updated_at = ?2 WHERE id = ?1",
                    params![id.0, Utc::now().to_rfc3339()],
                )
                .map_err(db_err)?;
            if changed == 0 {
                return Err(StoreError::DocumentNotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn read_content(&self, id: DocumentId) -> Result<Bytes, StoreError> {
        self.run(move |conn, _| {
            let content: Option<Vec<u8>> = conn
                .query_row("SELECT content FROM documents WHERE id = ?1", params![id.0], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(db_err)?;
            content.map(Bytes::from).ok_or(StoreError::DocumentNotFound(id))
        })
        .await
    }

    async fn delete(&self, id: DocumentId) -> Result<(), StoreError> {
        self.run(move |conn, _| {
            let changed = conn
                .execute("DELETE FROM documents WHERE id = ?1", params![id.0])
                .map_err(db_err)?;
            if changed == 0 {
                return Err(StoreError::DocumentNotFound(id));
            }
            Ok(())
        })
        .await
    }
}
