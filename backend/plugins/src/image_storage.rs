//! Image storage client API.
//!
//! Receives a base64 data-URI image from the rich-text editor, stores it as a
//! document, renames the document to carry its id, finalizes its size, and
//! answers with `{"docId": n}` or `{"error": "..."}`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};

use richdoc_core::{
    DocumentField, DocumentId, DocumentStore, FolderId, NewDocument, StoreError, UniquenessPolicy,
    UploadError, UploadRequest, UploadResult,
};
use richdoc_logging::{redact_sensitive_data, UploadEvent, UploadEventLogger};
use richdoc_media::{decode_image_data_uri, DecodedImage};

use crate::sdk::{ClientApi, ClientApiRequest, ClientApiResponse};

pub const TEMPLATE_ID: &str = "ImageStorageClientApi";

/// Name every uploaded image starts with, before its id is appended.
pub const UPLOADED_IMAGE_NAME: &str = "Rich Text Editor Uploaded Image";

/// Behaviour knobs supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Upper bound for each document store call. `None` waits indefinitely.
    pub store_timeout: Option<Duration>,
    /// Delete the created document when renaming or finalizing it fails.
    pub cleanup_on_failure: bool,
}

pub struct ImageStorageClientApi {
    store: Arc<dyn DocumentStore>,
    options: UploadOptions,
}

impl ImageStorageClientApi {
    pub fn new(store: Arc<dyn DocumentStore>, options: UploadOptions) -> Self {
        Self { store, options }
    }

    /// Run the upload pipeline for one editor payload.
    #[instrument(skip_all, fields(store = %self.store.name()))]
    pub async fn handle(&self, payload: Map<String, Value>) -> UploadResult {
        let mut folder = None;
        match self.run(payload, &mut folder).await {
            Ok((id, stored_in, image)) => {
                info!(doc_id = %id, "Returning new docId to client");
                UploadEventLogger::log_event(
                    TEMPLATE_ID,
                    UploadEvent::Stored {
                        doc_id: id.0,
                        folder_id: stored_in.0,
                        extension: image.extension,
                        size_bytes: image.bytes.len(),
                    },
                );
                UploadResult::DocId(id)
            }
            Err((err, doc_id)) => {
                UploadEventLogger::log_event(
                    TEMPLATE_ID,
                    UploadEvent::Failed {
                        step: err.step().to_string(),
                        folder_id: folder.map(|f| f.0),
                        doc_id: doc_id.map(|d| d.0),
                        error_msg: err.to_string(),
                    },
                );
                UploadResult::Error(err.to_string())
            }
        }
    }

    async fn run(
        &self,
        payload: Map<String, Value>,
        folder: &mut Option<FolderId>,
    ) -> Result<(DocumentId, FolderId, DecodedImage), (UploadError, Option<DocumentId>)> {
        let request = parse_request(payload).map_err(|e| (e, None))?;
        *folder = Some(request.image_destination_folder);

        let image = decode_image_data_uri(&request.base64).map_err(|e| {
            error!(error = %e, "Unable to decode image data from client");
            (UploadError::MalformedRequest(e.to_string()), None)
        })?;

        let target = request.image_destination_folder;
        let id = self
            .upload(&image, target)
            .await
            .map_err(|e| (e, None))?;

        if let Err(e) = self.rename_and_finalize(id).await {
            if self.options.cleanup_on_failure && e.leaves_document() {
                self.cleanup(id).await;
            }
            return Err((e, Some(id)));
        }
        Ok((id, target, image))
    }

    async fn upload(&self, image: &DecodedImage, folder: FolderId) -> Result<DocumentId, UploadError> {
        let doc = NewDocument::new(UPLOADED_IMAGE_NAME, image.extension.as_str(), folder);
        self.bounded(self.store.create_and_upload(doc, image.bytes.clone(), UniquenessPolicy::None))
            .await
            .map_err(|msg| {
                error!(folder = %folder, error = %msg, "Error uploading doc");
                UploadError::StoreUpload(msg)
            })
    }

    async fn rename_and_finalize(&self, id: DocumentId) -> Result<(), UploadError> {
        self.rename(id).await.map_err(|msg| {
            error!(doc_id = %id, error = %msg, "Error changing doc name");
            UploadError::StoreUpdate(msg)
        })?;

        self.bounded(self.store.finalize_size(id)).await.map_err(|msg| {
            error!(doc_id = %id, error = %msg, "Error setting size of document");
            UploadError::StoreFinalize(msg)
        })
    }

    async fn rename(&self, id: DocumentId) -> Result<(), String> {
        let mut record = self.bounded(self.store.get_current_version(id)).await?;
        record.name = format!("{} {}", record.name, id);
        self.bounded(self.store.update_fields(&record, &[DocumentField::Name], UniquenessPolicy::None))
            .await
    }

    async fn cleanup(&self, id: DocumentId) {
        match self.bounded(self.store.delete(id)).await {
            Ok(()) => {
                info!(doc_id = %id, "Deleted partially stored document");
                UploadEventLogger::log_event(TEMPLATE_ID, UploadEvent::CleanedUp { doc_id: id.0 });
            }
            Err(msg) => warn!(doc_id = %id, error = %msg, "Could not delete partially stored document"),
        }
    }

    /// Await a store call, applying the configured timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, String> {
        match self.options.store_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!(
                    "document store call timed out after {}ms",
                    limit.as_millis()
                )),
            },
            None => call.await.map_err(|e| e.to_string()),
        }
    }
}

/// Validate the untyped payload into an [`UploadRequest`].
fn parse_request(payload: Map<String, Value>) -> Result<UploadRequest, UploadError> {
    serde_json::from_value(Value::Object(payload)).map_err(|e| {
        let msg = redact_sensitive_data(&e.to_string());
        error!(error = %msg, "Unable to get data from client");
        UploadError::MalformedRequest(msg)
    })
}

#[async_trait]
impl ClientApi for ImageStorageClientApi {
    fn template_id(&self) -> &str {
        TEMPLATE_ID
    }

    fn description(&self) -> &str {
        "Stores rich-text editor images as documents and returns their ids"
    }

    async fn execute(&self, request: ClientApiRequest) -> ClientApiResponse {
        let result = self.handle(request.payload).await;
        ClientApiResponse::from_serializable(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use richdoc_core::{DocumentRecord, Folder};
    use richdoc_media::encode_image_data_uri;
    use richdoc_storage::{InMemoryDocumentStore, SqliteDocumentStore};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    struct Faults {
        upload: bool,
        update: bool,
        finalize: bool,
        upload_delay: Option<Duration>,
    }

    /// Records every store call and fails the ones named in `faults`.
    struct SpyStore {
        inner: InMemoryDocumentStore,
        calls: Mutex<Vec<&'static str>>,
        faults: Faults,
    }

    impl SpyStore {
        fn new(faults: Faults) -> Self {
            Self { inner: InMemoryDocumentStore::new(), calls: Mutex::new(Vec::new()), faults }
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DocumentStore for SpyStore {
        fn name(&self) -> &str {
            "spy"
        }

        async fn create_folder(&self, name: &str, parent: Option<FolderId>) -> Result<FolderId, StoreError> {
            self.inner.create_folder(name, parent).await
        }

        async fn list_folders(&self) -> Result<Vec<Folder>, StoreError> {
            self.inner.list_folders().await
        }

        async fn create_and_upload(
            &self,
            doc: NewDocument,
            content: Bytes,
            policy: UniquenessPolicy,
        ) -> Result<DocumentId, StoreError> {
            self.record("create_and_upload");
            if let Some(delay) = self.faults.upload_delay {
                tokio::time::sleep(delay).await;
            }
            if self.faults.upload {
                return Err(StoreError::Backend("quota exceeded".into()));
            }
            self.inner.create_and_upload(doc, content, policy).await
        }

        async fn get_current_version(&self, id: DocumentId) -> Result<DocumentRecord, StoreError> {
            self.record("get_current_version");
            self.inner.get_current_version(id).await
        }

        async fn update_fields(
            &self,
            record: &DocumentRecord,
            fields: &[DocumentField],
            policy: UniquenessPolicy,
        ) -> Result<(), StoreError> {
            self.record("update_fields");
            if self.faults.update {
                return Err(StoreError::Backend("permission denied".into()));
            }
            self.inner.update_fields(record, fields, policy).await
        }

        async fn finalize_size(&self, id: DocumentId) -> Result<(), StoreError> {
            self.record("finalize_size");
            if self.faults.finalize {
                return Err(StoreError::Backend("size unavailable".into()));
            }
            self.inner.finalize_size(id).await
        }

        async fn read_content(&self, id: DocumentId) -> Result<Bytes, StoreError> {
            self.inner.read_content(id).await
        }

        async fn delete(&self, id: DocumentId) -> Result<(), StoreError> {
            self.record("delete");
            self.inner.delete(id).await
        }
    }

    async fn setup(faults: Faults, options: UploadOptions) -> (Arc<SpyStore>, ImageStorageClientApi, FolderId) {
        let store = Arc::new(SpyStore::new(faults));
        let folder = store.create_folder("editor images", None).await.unwrap();
        let api = ImageStorageClientApi::new(store.clone(), options);
        (store, api, folder)
    }

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    fn png_payload(folder: FolderId) -> Map<String, Value> {
        payload(json!({
            "base64": "data:image/png;base64,aGVsbG8=",
            "imageDestinationFolder": folder.0
        }))
    }

    #[tokio::test]
    async fn stores_renames_and_finalizes() {
        let (store, api, folder) = setup(Faults::default(), UploadOptions::default()).await;

        let result = api.handle(png_payload(folder)).await;
        let id = result.doc_id().expect("upload should succeed");

        let record = store.get_current_version(id).await.unwrap();
        assert_eq!(record.parent_folder_id, folder);
        assert_eq!(record.name, format!("{UPLOADED_IMAGE_NAME} {id}"));
        assert!(record.name.ends_with(&format!(" {id}")));
        assert_eq!(record.extension, "png");
        assert_eq!(record.size_bytes, Some(5));
        assert_eq!(&store.read_content(id).await.unwrap()[..], b"hello");
        assert_eq!(
            store.calls(),
            vec!["create_and_upload", "get_current_version", "update_fields", "finalize_size"]
        );
    }

    #[tokio::test]
    async fn each_upload_gets_a_fresh_id() {
        let (_store, api, folder) = setup(Faults::default(), UploadOptions::default()).await;
        let first = api.handle(png_payload(folder)).await.doc_id().unwrap();
        let second = api.handle(png_payload(folder)).await.doc_id().unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn missing_fields_never_reach_the_store() {
        let (store, api, folder) = setup(Faults::default(), UploadOptions::default()).await;

        let no_image = api.handle(payload(json!({ "imageDestinationFolder": folder.0 }))).await;
        assert!(matches!(&no_image, UploadResult::Error(msg) if msg.contains("base64")));

        let no_folder = api
            .handle(payload(json!({ "base64": "data:image/png;base64,aGVsbG8=" })))
            .await;
        assert!(matches!(&no_folder, UploadResult::Error(msg) if msg.contains("imageDestinationFolder")));

        let bad_folder = api
            .handle(payload(json!({
                "base64": "data:image/png;base64,aGVsbG8=",
                "imageDestinationFolder": "images"
            })))
            .await;
        assert!(!bad_folder.is_success());

        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_data_uri_never_reaches_the_store() {
        let (store, api, folder) = setup(Faults::default(), UploadOptions::default()).await;

        for bad in ["aGVsbG8=", "data:image/png;base64", "data:image/png,aGVsbG8=", "data:text/plain;base64,aGVsbG8="] {
            let result = api
                .handle(payload(json!({ "base64": bad, "imageDestinationFolder": folder.0 })))
                .await;
            assert!(
                matches!(&result, UploadResult::Error(msg) if msg.starts_with("malformed request")),
                "{bad} should be rejected"
            );
        }
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn upload_failure_skips_rename_and_finalize() {
        let (store, api, _folder) = setup(Faults::default(), UploadOptions::default()).await;

        let result = api.handle(png_payload(FolderId(999))).await;
        assert_eq!(result, UploadResult::Error("folder 999 does not exist".into()));
        assert_eq!(store.calls(), vec!["create_and_upload"]);

        let faults = Faults { upload: true, ..Faults::default() };
        let (store, api, folder) = setup(faults, UploadOptions::default()).await;
        let result = api.handle(png_payload(folder)).await;
        assert_eq!(result, UploadResult::Error("document store error: quota exceeded".into()));
        assert_eq!(store.calls(), vec!["create_and_upload"]);
    }

    #[tokio::test]
    async fn rename_failure_leaves_original_document() {
        let faults = Faults { update: true, ..Faults::default() };
        let (store, api, folder) = setup(faults, UploadOptions::default()).await;

        let result = api.handle(png_payload(folder)).await;
        assert_eq!(result, UploadResult::Error("document store error: permission denied".into()));
        assert!(!store.calls().contains(&"finalize_size"));
        assert!(!store.calls().contains(&"delete"));

        let record = store.inner.get_current_version(DocumentId(1)).await.unwrap();
        assert_eq!(record.name, UPLOADED_IMAGE_NAME);
        assert_eq!(record.size_bytes, None);
    }

    #[tokio::test]
    async fn finalize_failure_leaves_renamed_document() {
        let faults = Faults { finalize: true, ..Faults::default() };
        let (store, api, folder) = setup(faults, UploadOptions::default()).await;

        let result = api.handle(png_payload(folder)).await;
        assert_eq!(result, UploadResult::Error("document store error: size unavailable".into()));

        let record = store.inner.get_current_version(DocumentId(1)).await.unwrap();
        assert_eq!(record.name, format!("{UPLOADED_IMAGE_NAME} 1"));
        assert_eq!(record.size_bytes, None);
    }

    #[tokio::test]
    async fn cleanup_deletes_partially_stored_document() {
        let faults = Faults { update: true, ..Faults::default() };
        let options = UploadOptions { cleanup_on_failure: true, ..UploadOptions::default() };
        let (store, api, folder) = setup(faults, options).await;

        let result = api.handle(png_payload(folder)).await;
        assert!(!result.is_success());
        assert_eq!(store.calls().last(), Some(&"delete"));
        assert!(matches!(
            store.inner.get_current_version(DocumentId(1)).await,
            Err(StoreError::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn slow_store_is_reported_once() {
        let faults = Faults { upload_delay: Some(Duration::from_millis(500)), ..Faults::default() };
        let options = UploadOptions { store_timeout: Some(Duration::from_millis(20)), ..UploadOptions::default() };
        let (store, api, folder) = setup(faults, options).await;

        let result = api.handle(png_payload(folder)).await;
        assert_eq!(result, UploadResult::Error("document store call timed out after 20ms".into()));
        assert_eq!(store.calls(), vec!["create_and_upload"]);
    }

    #[tokio::test]
    async fn locked_sqlite_store_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.db");
        let store = Arc::new(SqliteDocumentStore::open(path.to_str().unwrap()).unwrap());
        let folder = store.create_folder("editor images", None).await.unwrap();
        let options = UploadOptions { store_timeout: Some(Duration::from_millis(50)), ..UploadOptions::default() };
        let api = ImageStorageClientApi::new(store.clone(), options);

        let locker = rusqlite::Connection::open(&path).unwrap();
        locker.execute_batch("BEGIN EXCLUSIVE").unwrap();

        let started = Instant::now();
        let result = api.handle(png_payload(folder)).await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(result, UploadResult::Error("document store call timed out after 50ms".into()));

        locker.execute_batch("ROLLBACK").unwrap();
        assert!(matches!(
            store.get_current_version(DocumentId(1)).await,
            Err(StoreError::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn arbitrary_bytes_survive_the_pipeline() {
        let (store, api, folder) = setup(Faults::default(), UploadOptions::default()).await;
        let raw: Vec<u8> = (0..4096u32).map(|i| (i.wrapping_mul(31) % 256) as u8).collect();

        let result = api
            .handle(payload(json!({
                "base64": encode_image_data_uri("webp", &raw),
                "imageDestinationFolder": folder.0
            })))
            .await;
        let id = result.doc_id().unwrap();

        assert_eq!(&store.read_content(id).await.unwrap()[..], &raw[..]);
        assert_eq!(store.get_current_version(id).await.unwrap().extension, "webp");
    }

    #[tokio::test]
    async fn execute_answers_with_wire_payload() {
        let (_store, api, folder) = setup(Faults::default(), UploadOptions::default()).await;

        let ok = api.execute(ClientApiRequest::new(png_payload(folder))).await;
        assert_eq!(ok.payload, json!({ "docId": 1 }));

        let err = api.execute(ClientApiRequest::default()).await;
        assert!(err.payload["error"].as_str().unwrap().contains("missing field"));
    }
}
