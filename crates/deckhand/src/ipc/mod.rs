//! IPC surface — channel names, payload types, the transport seam, and the
//! channel registry enforcing at most one attached callable per channel.

pub mod registry;
pub mod transport;

pub use registry::ChannelRegistry;
pub use transport::{EventListener, InProcessTransport, InvokeHandler, Transport};

use serde::{Deserialize, Serialize};

/// Channel names are part of the wire contract shared with the desktop
/// shell; renaming one is a breaking change.
pub mod channels {
    /// Invoke: no request payload, responds with [`super::HostInfo`].
    pub const HOST_INFO: &str = "extension/host-info";
    /// Invoke: no request payload, responds with the installed-extension
    /// descriptors.
    pub const LIST: &str = "extension/list";
}

/// Snapshot of the machine the manager runs on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInfo {
    pub platform: String,
    pub arch: String,
    pub hostname: String,
}
