//! Client API invocation endpoint.
//!
//! `POST /api/client-apis/:template_id` with the payload object as body. The
//! client API's own answer (success or error payload) is always a 200; only
//! routing and framing problems produce other statuses.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use richdoc_plugins::ClientApiRequest;

use crate::server::GatewayState;

/// Handler for `GET /api/client-apis`
pub async fn list_client_apis(State(state): State<GatewayState>) -> Json<Value> {
    let apis: Vec<Value> = state
        .registry
        .list()
        .into_iter()
        .filter_map(|id| state.registry.get(id))
        .map(|api| json!({ "templateId": api.template_id(), "description": api.description() }))
        .collect();
    Json(json!({ "clientApis": apis }))
}

/// Handler for `POST /api/client-apis/:template_id`
pub async fn invoke_client_api(
    State(state): State<GatewayState>,
    Path(template_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(template_id = %template_id, error = %rejection, "Rejected client API body");
            return (rejection.status(), Json(json!({ "error": rejection.body_text() })));
        }
    };

    let Some(request) = ClientApiRequest::from_value(body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "request payload must be a JSON object" })),
        );
    };

    debug!(template_id = %template_id, "Invoking client API");
    match state.registry.invoke(&template_id, request).await {
        Some(response) => (StatusCode::OK, Json(response.payload)),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown client API '{template_id}'") })),
        ),
    }
}
