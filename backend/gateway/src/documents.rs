//! Document server: serves stored documents over HTTP.
//!
//! The editor embeds `/doc/:id` as the image source once an upload returns.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use richdoc_core::{DocumentId, StoreError};
use richdoc_media::{is_inline_safe, mime_for_extension};

use crate::server::GatewayState;

/// GET /doc/:id — stream a document's content from the store.
pub async fn serve_document(
    Path(id): Path<i64>,
    State(state): State<GatewayState>,
) -> Response {
    let id = DocumentId(id);
    let fetched = async {
        let record = state.store.get_current_version(id).await?;
        let content = state.store.read_content(id).await?;
        Ok::<_, StoreError>((record, content))
    }
    .await;

    match fetched {
        Ok((record, content)) => {
            debug!(doc_id = %id, bytes = content.len(), "Serving document");
            let mime = mime_for_extension(&record.extension);
            let file_name = record.file_name().replace('"', "");
            let disposition = if is_inline_safe(mime) {
                format!("inline; filename=\"{file_name}\"")
            } else {
                format!("attachment; filename=\"{file_name}\"")
            };

            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
            headers.insert(
                header::CONTENT_DISPOSITION,
                HeaderValue::from_str(&disposition)
                    .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
            );
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("private, max-age=86400"));
            headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

            (StatusCode::OK, headers, content).into_response()
        }
        Err(StoreError::DocumentNotFound(_)) => {
            (StatusCode::NOT_FOUND, "Document not found").into_response()
        }
        Err(e) => {
            warn!(doc_id = %id, error = %e, "Failed to read document");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read document").into_response()
        }
    }
}
