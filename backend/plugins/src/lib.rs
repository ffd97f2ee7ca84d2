pub mod image_storage;
pub mod registry;
pub mod sdk;

pub use image_storage::{ImageStorageClientApi, UploadOptions, TEMPLATE_ID, UPLOADED_IMAGE_NAME};
pub use registry::ClientApiRegistry;
pub use sdk::{ClientApi, ClientApiRequest, ClientApiResponse};
