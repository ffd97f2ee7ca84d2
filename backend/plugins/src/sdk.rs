//! Client API SDK
//!
//! The boundary between the host and a connected-system client API: the host
//! hands over an untyped JSON payload and always gets a JSON payload back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Payload sent by the host when invoking a client API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientApiRequest {
    pub payload: Map<String, Value>,
}

impl ClientApiRequest {
    pub fn new(payload: Map<String, Value>) -> Self {
        Self { payload }
    }

    /// Build a request from a JSON value; `None` if it is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(payload) => Some(Self { payload }),
            _ => None,
        }
    }
}

/// Payload returned to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientApiResponse {
    pub payload: Value,
}

impl ClientApiResponse {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// Serialize any result type into a response payload.
    pub fn from_serializable<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(payload) => Self { payload },
            Err(e) => Self::error(e.to_string()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { payload: json!({ "error": message.into() }) }
    }
}

/// A named client API registered with the host.
///
/// `execute` never fails: every problem is reported inside the response
/// payload.
#[async_trait]
pub trait ClientApi: Send + Sync {
    /// Template id the host uses to address this API.
    fn template_id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn execute(&self, request: ClientApiRequest) -> ClientApiResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_objects_become_requests() {
        assert!(ClientApiRequest::from_value(json!({ "a": 1 })).is_some());
        assert!(ClientApiRequest::from_value(json!([1, 2])).is_none());
        assert!(ClientApiRequest::from_value(json!("text")).is_none());
    }

    #[test]
    fn error_response_shape() {
        assert_eq!(ClientApiResponse::error("nope").payload, json!({ "error": "nope" }));
    }
}
