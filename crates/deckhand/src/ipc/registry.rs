use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use super::transport::{EventListener, InvokeHandler, Transport};

#[derive(Debug, Clone, Copy)]
enum ChannelKind {
    Listener,
    Handler,
}

/// Tracks what is attached to each channel and enforces the at-most-one
/// invariant: attaching to an occupied channel detaches the previous
/// callable first and logs a diagnostic.
///
/// Channel names are a small fixed namespace shared process-wide; without
/// the replace rule, a backend switch would accumulate duplicate handlers
/// firing more than once per request.
pub struct ChannelRegistry {
    transport: Arc<dyn Transport>,
    attached: Mutex<HashMap<String, ChannelKind>>,
}

impl ChannelRegistry {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            attached: Mutex::new(HashMap::new()),
        }
    }

    pub async fn attach_listener(&self, channel: &str, listener: EventListener) {
        let mut attached = self.attached.lock().await;
        if let Some(previous) = attached.get(channel) {
            warn!(channel, previous = ?previous, "duplicate listener registration, detaching previous");
            self.transport.detach(channel).await;
        }
        self.transport.attach_listener(channel, listener).await;
        attached.insert(channel.to_string(), ChannelKind::Listener);
    }

    pub async fn attach_handler(&self, channel: &str, handler: InvokeHandler) {
        let mut attached = self.attached.lock().await;
        if let Some(previous) = attached.get(channel) {
            warn!(channel, previous = ?previous, "duplicate handler registration, detaching previous");
            self.transport.detach(channel).await;
        }
        self.transport.attach_handler(channel, handler).await;
        attached.insert(channel.to_string(), ChannelKind::Handler);
    }

    /// Detach every attached channel and clear the registry. A no-op when
    /// nothing is attached; the transport teardown has completed when this
    /// returns.
    pub async fn detach_all(&self) {
        let mut attached = self.attached.lock().await;
        for channel in attached.keys() {
            self.transport.detach(channel).await;
        }
        attached.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::transport::InProcessTransport;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener() -> (EventListener, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let listener: EventListener = {
            let hits = hits.clone();
            Arc::new(move |_payload| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        (listener, hits)
    }

    fn tagged_handler(tag: &'static str) -> InvokeHandler {
        Arc::new(move |_request| async move { Ok(json!(tag)) }.boxed())
    }

    #[tokio::test]
    async fn second_listener_replaces_the_first() {
        let transport = Arc::new(InProcessTransport::new());
        let registry = ChannelRegistry::new(transport.clone());
        let (first, first_hits) = counting_listener();
        let (second, second_hits) = counting_listener();

        registry.attach_listener("extension/changed", first).await;
        registry.attach_listener("extension/changed", second).await;

        transport.emit("extension/changed", json!({})).await;
        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_handler_replaces_the_first() {
        let transport = Arc::new(InProcessTransport::new());
        let registry = ChannelRegistry::new(transport.clone());

        registry
            .attach_handler("extension/host-info", tagged_handler("first"))
            .await;
        registry
            .attach_handler("extension/host-info", tagged_handler("second"))
            .await;

        let response = transport
            .invoke("extension/host-info", json!({}))
            .await
            .unwrap();
        assert_eq!(response, json!("second"));
    }

    #[tokio::test]
    async fn detach_all_silences_every_channel() {
        let transport = Arc::new(InProcessTransport::new());
        let registry = ChannelRegistry::new(transport.clone());
        let (listener, hits) = counting_listener();

        registry.attach_listener("extension/changed", listener).await;
        registry
            .attach_handler("extension/host-info", tagged_handler("info"))
            .await;

        registry.detach_all().await;

        transport.emit("extension/changed", json!({})).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(transport
            .invoke("extension/host-info", json!({}))
            .await
            .is_err());

        // repeat on an empty registry is a no-op
        registry.detach_all().await;
    }
}
