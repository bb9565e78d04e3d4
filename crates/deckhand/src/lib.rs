//! Extension lifecycle management for a container-runtime desktop companion.
//!
//! This crate owns the single live extension manager bound to the selected
//! container/Kubernetes backend: it reconciles the desired install state of
//! a set of extensions, serves their IPC channels, and supports hot-swapping
//! the backend (the old manager is fully torn down before a new one starts).

pub mod config;
pub mod extensions;
pub mod ipc;

pub use config::ManagerConfig;
pub use extensions::{
    Extension, ExtensionError, ExtensionFactory, ExtensionManager, ExtensionMetadata,
    ExtensionResult, InstalledExtension, ManagerFactory, RuntimeClient,
};
pub use ipc::{ChannelRegistry, HostInfo, InProcessTransport, Transport};
