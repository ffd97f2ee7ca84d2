//! CLI Upload Command
//!
//! Sends a local image through the same pipeline the editor uses and prints
//! the client API payload.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::{json, Map};

use richdoc_core::{DocumentStore, UploadResult};
use richdoc_media::{data_uri_extension, encode_image_data_uri};
use richdoc_plugins::{ImageStorageClientApi, UploadOptions};

pub async fn run(
    store: Arc<dyn DocumentStore>,
    options: UploadOptions,
    file: &Path,
    folder: i64,
) -> Result<()> {
    let Some(extension) = data_uri_extension(file) else {
        bail!("{} is not a supported image type", file.display());
    };
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut payload = Map::new();
    payload.insert("base64".into(), json!(encode_image_data_uri(extension, &bytes)));
    payload.insert("imageDestinationFolder".into(), json!(folder));

    let api = ImageStorageClientApi::new(store, options);
    let result = api.handle(payload).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    match result {
        UploadResult::DocId(_) => Ok(()),
        UploadResult::Error(msg) => bail!("Upload failed: {msg}"),
    }
}
