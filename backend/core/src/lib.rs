pub mod error;
pub mod traits;
pub mod types;

pub use error::{StoreError, UploadError, UploadStep};
pub use traits::DocumentStore;
pub use types::{
    DocumentField, DocumentId, DocumentRecord, Folder, FolderId, NewDocument, UniquenessPolicy,
    UploadRequest, UploadResult,
};
