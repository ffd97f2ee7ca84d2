/// Client API registry — tracks the client APIs a host can invoke.
///
/// APIs are registered with their dependencies already wired in; the registry
/// never constructs them itself.
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::sdk::{ClientApi, ClientApiRequest, ClientApiResponse};

#[derive(Default)]
pub struct ClientApiRegistry {
    apis: HashMap<String, Arc<dyn ClientApi>>,
}

impl ClientApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client API under its template id.
    pub fn register(&mut self, api: Arc<dyn ClientApi>) -> Result<()> {
        let id = api.template_id().to_string();
        if id.is_empty() {
            bail!("Client API has an empty template id");
        }
        if self.apis.contains_key(&id) {
            bail!("Client API '{}' is already registered", id);
        }
        info!("[ClientApis] Registered: {}", id);
        self.apis.insert(id, api);
        Ok(())
    }

    pub fn get(&self, template_id: &str) -> Option<Arc<dyn ClientApi>> {
        self.apis.get(template_id).cloned()
    }

    /// Template ids in sorted order.
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.apis.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn unregister(&mut self, template_id: &str) -> bool {
        self.apis.remove(template_id).is_some()
    }

    /// Invoke a client API; `None` when no API has that template id.
    pub async fn invoke(
        &self,
        template_id: &str,
        request: ClientApiRequest,
    ) -> Option<ClientApiResponse> {
        let Some(api) = self.apis.get(template_id) else {
            warn!("[ClientApis] Unknown template id: {}", template_id);
            return None;
        };
        Some(api.execute(request).await)
    }
}
