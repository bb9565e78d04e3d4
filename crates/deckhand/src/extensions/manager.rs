use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::config::ManagerConfig;
use crate::ipc::transport::{InvokeHandler, Transport};
use crate::ipc::{channels, ChannelRegistry, HostInfo};

use super::cache::ExtensionCache;
use super::{
    encode_dir_name, Extension, ExtensionError, ExtensionFactory, ExtensionResult,
    InstalledExtension, RuntimeClient,
};

/// Owns one backend's extension lifecycle: the channel registry, the handle
/// cache, and the on-disk extension root.
///
/// A manager is bound to a single [`RuntimeClient`] for its whole lifetime;
/// switching backends means shutting this manager down and constructing a
/// new one (see [`super::ManagerFactory`]).
pub struct ExtensionManager {
    client: Arc<dyn RuntimeClient>,
    cache: Arc<ExtensionCache>,
    channels: ChannelRegistry,
    extension_root: PathBuf,
}

impl std::fmt::Debug for ExtensionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionManager")
            .field("extension_root", &self.extension_root)
            .finish_non_exhaustive()
    }
}

impl ExtensionManager {
    pub fn new(
        client: Arc<dyn RuntimeClient>,
        factory: Arc<dyn ExtensionFactory>,
        transport: Arc<dyn Transport>,
        extension_root: PathBuf,
    ) -> Self {
        let cache = Arc::new(ExtensionCache::new(client.clone(), factory));
        Self {
            client,
            cache,
            channels: ChannelRegistry::new(transport),
            extension_root,
        }
    }

    /// Attach the manager's channels, then reconcile every extension named
    /// in `config` to its desired install state.
    ///
    /// The per-extension operations run concurrently; each failure is
    /// logged with the extension id and the attempted operation and does
    /// not affect its siblings. `init` returns once all operations have
    /// settled and never fails on an extension-level error.
    pub async fn init(&self, config: &ManagerConfig) {
        self.channels
            .attach_handler(channels::HOST_INFO, host_info_handler())
            .await;
        self.channels
            .attach_handler(
                channels::LIST,
                list_handler(self.cache.clone(), self.extension_root.clone()),
            )
            .await;

        let operations = config.extensions.iter().map(|(id, desired)| {
            let desired = *desired;
            async move {
                let handle = self.cache.get(id).await;
                let (operation, result) = if desired {
                    ("install", handle.install().await)
                } else {
                    ("uninstall", handle.uninstall().await)
                };
                if let Err(error) = result {
                    warn!(extension = %id, operation, error = %error, "extension reconcile failed");
                }
            }
        });
        join_all(operations).await;

        debug!(backend = %self.client.name(), "extension manager initialized");
    }

    pub fn client(&self) -> &Arc<dyn RuntimeClient> {
        &self.client
    }

    /// Same handle for repeated calls with the same id.
    pub async fn extension(&self, id: &str) -> Arc<dyn Extension> {
        self.cache.get(id).await
    }

    /// Cross-reference the handle cache against the on-disk extension root
    /// and resolve metadata for each installed extension. Order of the
    /// returned list is unspecified.
    pub async fn installed_extensions(&self) -> ExtensionResult<Vec<InstalledExtension>> {
        list_installed(&self.cache, &self.extension_root).await
    }

    /// Detach every channel this manager registered. Tolerates repeat
    /// calls; the transport teardown has completed when this returns.
    pub async fn shutdown(&self) {
        self.channels.detach_all().await;
        debug!(backend = %self.client.name(), "extension manager shut down");
    }
}

fn host_info_handler() -> InvokeHandler {
    Arc::new(|_request| {
        async move {
            let info = HostInfo {
                platform: std::env::consts::OS.to_string(),
                arch: std::env::consts::ARCH.to_string(),
                hostname: sys_info::hostname().unwrap_or_else(|_| "unknown".to_string()),
            };
            Ok(serde_json::to_value(info)?)
        }
        .boxed()
    })
}

fn list_handler(cache: Arc<ExtensionCache>, extension_root: PathBuf) -> InvokeHandler {
    Arc::new(move |_request| {
        let cache = cache.clone();
        let extension_root = extension_root.clone();
        async move {
            let installed = list_installed(&cache, &extension_root).await?;
            Ok(serde_json::to_value(installed)?)
        }
        .boxed()
    })
}

/// A missing extension root means zero installed extensions; any other
/// listing failure propagates. Metadata failures are extension-level and
/// only drop the affected entry.
async fn list_installed(
    cache: &ExtensionCache,
    extension_root: &Path,
) -> ExtensionResult<Vec<InstalledExtension>> {
    let mut entries = match tokio::fs::read_dir(extension_root).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ExtensionError::Io {
                path: extension_root.to_path_buf(),
                source,
            })
        }
    };

    let mut on_disk = HashSet::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                on_disk.insert(entry.file_name().to_string_lossy().into_owned());
            }
            Ok(None) => break,
            Err(source) => {
                return Err(ExtensionError::Io {
                    path: extension_root.to_path_buf(),
                    source,
                })
            }
        }
    }

    let lookups = cache
        .known()
        .await
        .into_iter()
        .filter(|(id, _)| on_disk.contains(&encode_dir_name(id)))
        .map(|(id, handle)| async move {
            match handle.metadata().await {
                Ok(metadata) => Some(InstalledExtension { id, metadata }),
                Err(error) => {
                    warn!(extension = %id, error = %error, "failed to resolve extension metadata");
                    None
                }
            }
        });

    Ok(join_all(lookups).await.into_iter().flatten().collect())
}
