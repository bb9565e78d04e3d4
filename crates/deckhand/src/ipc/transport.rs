use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::extensions::{ExtensionError, ExtensionResult};

/// Fire-and-forget event callback.
pub type EventListener = Arc<dyn Fn(Value) + Send + Sync>;

/// Request/response callback; resolves to a response payload or fails.
pub type InvokeHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, ExtensionResult<Value>> + Send + Sync>;

/// Transport the channel registry attaches callables to.
///
/// Implementations bridge to the actual IPC layer (an in-process bus here,
/// the desktop shell's message pipe in production). `detach` must have
/// completed its teardown when it returns, so a caller can rely on
/// detach-before-attach ordering.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn attach_listener(&self, channel: &str, listener: EventListener);

    async fn attach_handler(&self, channel: &str, handler: InvokeHandler);

    /// Remove whatever is attached to `channel`, listener or handler.
    async fn detach(&self, channel: &str);
}

/// In-memory transport: routes `emit` to the attached listener and
/// `invoke` to the attached handler.
#[derive(Default)]
pub struct InProcessTransport {
    listeners: Mutex<HashMap<String, EventListener>>,
    handlers: Mutex<HashMap<String, InvokeHandler>>,
}

impl InProcessTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire an event at `channel`; a missing listener is not an error.
    pub async fn emit(&self, channel: &str, payload: Value) {
        let listener = self.listeners.lock().await.get(channel).cloned();
        if let Some(listener) = listener {
            listener(payload);
        }
    }

    /// Send a request to `channel` and await its response.
    pub async fn invoke(&self, channel: &str, payload: Value) -> ExtensionResult<Value> {
        let handler = self.handlers.lock().await.get(channel).cloned();
        match handler {
            Some(handler) => handler(payload).await,
            None => Err(ExtensionError::NoHandler {
                channel: channel.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn attach_listener(&self, channel: &str, listener: EventListener) {
        self.listeners
            .lock()
            .await
            .insert(channel.to_string(), listener);
    }

    async fn attach_handler(&self, channel: &str, handler: InvokeHandler) {
        self.handlers
            .lock()
            .await
            .insert(channel.to_string(), handler);
    }

    async fn detach(&self, channel: &str) {
        self.listeners.lock().await.remove(channel);
        self.handlers.lock().await.remove(channel);
    }
}
