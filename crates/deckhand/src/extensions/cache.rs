use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::{Extension, ExtensionFactory, RuntimeClient};

/// Lazily constructs and memoizes one [`Extension`] handle per identifier.
///
/// Handles are scoped to the owning manager's lifetime: repeated `get`
/// calls return the same handle, and the whole cache is discarded with the
/// manager. There is no eviction.
pub struct ExtensionCache {
    client: Arc<dyn RuntimeClient>,
    factory: Arc<dyn ExtensionFactory>,
    handles: Mutex<HashMap<String, Arc<dyn Extension>>>,
}

impl ExtensionCache {
    pub fn new(client: Arc<dyn RuntimeClient>, factory: Arc<dyn ExtensionFactory>) -> Self {
        Self {
            client,
            factory,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Return the handle for `id`, constructing it on first reference.
    pub async fn get(&self, id: &str) -> Arc<dyn Extension> {
        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.get(id) {
            return handle.clone();
        }
        let handle = self.factory.create(id, self.client.clone());
        handles.insert(id.to_string(), handle.clone());
        handle
    }

    /// Snapshot of every handle constructed so far.
    pub async fn known(&self) -> Vec<(String, Arc<dyn Extension>)> {
        self.handles
            .lock()
            .await
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect()
    }
}
