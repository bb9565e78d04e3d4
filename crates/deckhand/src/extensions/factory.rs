use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ManagerConfig;
use crate::ipc::transport::Transport;

use super::manager::ExtensionManager;
use super::{ExtensionError, ExtensionFactory, ExtensionResult, RuntimeClient};

struct ManagerSlot {
    client: Arc<dyn RuntimeClient>,
    manager: Arc<ExtensionManager>,
}

/// Guarded factory for the single live [`ExtensionManager`].
///
/// Holds the current instance together with the runtime-client identity it
/// was built for. The slot lock is held across shutdown, construction, and
/// init, so the previous manager's channels are fully detached before the
/// next manager attaches anything — two managers never share the transport.
///
/// The embedding application holds one factory in its state; the factory
/// itself is the singleton choke point.
pub struct ManagerFactory {
    transport: Arc<dyn Transport>,
    extensions: Arc<dyn ExtensionFactory>,
    extension_root: PathBuf,
    current: Mutex<Option<ManagerSlot>>,
}

impl ManagerFactory {
    pub fn new(
        transport: Arc<dyn Transport>,
        extensions: Arc<dyn ExtensionFactory>,
        extension_root: PathBuf,
    ) -> Self {
        Self {
            transport,
            extensions,
            extension_root,
            current: Mutex::new(None),
        }
    }

    /// The live manager, if any.
    pub async fn current(&self) -> Option<Arc<ExtensionManager>> {
        let slot = self.current.lock().await;
        if slot.is_none() {
            debug!("no extension manager instance exists");
        }
        slot.as_ref().map(|slot| slot.manager.clone())
    }

    /// Reuse the live manager when `client` is the backend it was built
    /// for; otherwise tear the old manager down and stand up a new one.
    ///
    /// `config` is required when a manager has to be constructed and is
    /// ignored on reuse — the existing manager already applied its
    /// configuration at init.
    pub async fn acquire(
        &self,
        client: Arc<dyn RuntimeClient>,
        config: Option<&ManagerConfig>,
    ) -> ExtensionResult<Arc<ExtensionManager>> {
        let mut current = self.current.lock().await;

        if let Some(slot) = current.as_ref() {
            if same_client(&slot.client, &client) {
                return Ok(slot.manager.clone());
            }
        }

        let config = config.ok_or(ExtensionError::MissingConfig)?;

        if let Some(previous) = current.take() {
            info!(
                from = %previous.client.name(),
                to = %client.name(),
                "replacing extension manager"
            );
            previous.manager.shutdown().await;
        }

        let manager = Arc::new(ExtensionManager::new(
            client.clone(),
            self.extensions.clone(),
            self.transport.clone(),
            self.extension_root.clone(),
        ));
        manager.init(config).await;
        *current = Some(ManagerSlot {
            client,
            manager: manager.clone(),
        });
        Ok(manager)
    }
}

/// Backend identity is the `Arc` allocation, not the pointee's value.
fn same_client(a: &Arc<dyn RuntimeClient>, b: &Arc<dyn RuntimeClient>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
