//! Extension lifecycle — handle construction, desired-state reconciliation,
//! and the process-wide manager singleton.
//!
//! Components:
//! - `ExtensionCache` — lazy get-or-create memoization of extension handles
//! - `ExtensionManager` — channels + cache + on-disk reconciliation
//! - `ManagerFactory` — the singleton accessor with backend-swap semantics
//!
//! Extension internals (download, metadata retrieval, runtime startup) live
//! behind the [`Extension`] and [`ExtensionFactory`] traits; this module
//! never constructs a handle itself.

pub mod cache;
pub mod factory;
pub mod manager;

pub use cache::ExtensionCache;
pub use factory::ManagerFactory;
pub use manager::ExtensionManager;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub type ExtensionResult<T> = Result<T, ExtensionError>;

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("configuration is required to construct an extension manager")]
    MissingConfig,

    #[error("failed to list extension root {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no handler attached for channel {channel}")]
    NoHandler { channel: String },

    #[error("invalid channel payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("extension {extension} failed to {operation}: {message}")]
    Operation {
        extension: String,
        operation: String,
        message: String,
    },
}

/// Identity of the currently selected container/Kubernetes backend.
///
/// Compared only by `Arc` identity, never by value — two clients with the
/// same name are still two different backends.
pub trait RuntimeClient: Send + Sync {
    /// Backend name, for diagnostics only.
    fn name(&self) -> &str;
}

/// One extension's install/uninstall/metadata surface.
///
/// A handle is constructed once per identifier per manager lifetime and
/// persists across install/uninstall cycles; only its installed state
/// changes.
#[async_trait]
pub trait Extension: Send + Sync {
    fn id(&self) -> &str;

    async fn install(&self) -> ExtensionResult<()>;

    async fn uninstall(&self) -> ExtensionResult<()>;

    async fn metadata(&self) -> ExtensionResult<ExtensionMetadata>;
}

/// Constructs extension handles bound to a runtime client.
pub trait ExtensionFactory: Send + Sync {
    fn create(&self, id: &str, client: Arc<dyn RuntimeClient>) -> Arc<dyn Extension>;
}

/// Descriptor resolved from an installed extension's packaging metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledExtension {
    pub id: String,
    pub metadata: ExtensionMetadata,
}

/// Directory-safe encoding of an extension identifier.
///
/// Identifiers are registry image references and may contain `/` and `:`;
/// the encoded form names the extension's directory under the extension
/// root, and presence of that directory is the sole signal of "installed
/// on disk".
pub fn encode_dir_name(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}
