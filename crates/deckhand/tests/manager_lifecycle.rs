use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use deckhand::ipc::channels;
use deckhand::{
    Extension, ExtensionFactory, ExtensionMetadata, ExtensionResult, HostInfo, InProcessTransport,
    ManagerConfig, ManagerFactory, RuntimeClient,
};

struct Backend(&'static str);

impl RuntimeClient for Backend {
    fn name(&self) -> &str {
        self.0
    }
}

struct FakeExtension {
    id: String,
    installs: Arc<AtomicUsize>,
    uninstalls: Arc<AtomicUsize>,
}

#[async_trait]
impl Extension for FakeExtension {
    fn id(&self) -> &str {
        &self.id
    }

    async fn install(&self) -> ExtensionResult<()> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn uninstall(&self) -> ExtensionResult<()> {
        self.uninstalls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn metadata(&self) -> ExtensionResult<ExtensionMetadata> {
        Ok(ExtensionMetadata {
            title: format!("{} extension", self.id),
            version: "1.0.0".to_string(),
            ..Default::default()
        })
    }
}

#[derive(Default)]
struct FakeRegistry {
    installs: Arc<AtomicUsize>,
    uninstalls: Arc<AtomicUsize>,
}

impl ExtensionFactory for FakeRegistry {
    fn create(&self, id: &str, _client: Arc<dyn RuntimeClient>) -> Arc<dyn Extension> {
        Arc::new(FakeExtension {
            id: id.to_string(),
            installs: self.installs.clone(),
            uninstalls: self.uninstalls.clone(),
        })
    }
}

fn config_for(entries: &[(&str, bool)]) -> ManagerConfig {
    ManagerConfig {
        extensions: entries
            .iter()
            .map(|(id, desired)| (id.to_string(), *desired))
            .collect(),
    }
}

#[tokio::test]
async fn full_lifecycle_across_a_backend_swap() {
    let transport = Arc::new(InProcessTransport::new());
    let registry = Arc::new(FakeRegistry::default());
    let installs = registry.installs.clone();

    let extension_root = tempfile::tempdir().unwrap();
    let tools_id = "registry.example.com/dev/tools";
    std::fs::create_dir(
        extension_root
            .path()
            .join(deckhand::extensions::encode_dir_name(tools_id)),
    )
    .unwrap();

    let factory = ManagerFactory::new(
        transport.clone(),
        registry,
        extension_root.path().to_path_buf(),
    );

    // no client, no singleton: absent, not an error
    assert!(factory.current().await.is_none());

    let moby: Arc<dyn RuntimeClient> = Arc::new(Backend("moby"));
    let manager = factory
        .acquire(moby.clone(), Some(&config_for(&[(tools_id, true)])))
        .await
        .unwrap();
    assert_eq!(installs.load(Ordering::SeqCst), 1);

    // host-info answers over IPC with the machine snapshot
    let raw = transport
        .invoke(channels::HOST_INFO, json!(null))
        .await
        .unwrap();
    let info: HostInfo = serde_json::from_value(raw).unwrap();
    assert_eq!(info.platform, std::env::consts::OS);
    assert_eq!(info.arch, std::env::consts::ARCH);
    assert!(!info.hostname.is_empty());

    // the reconciled extension shows up in the IPC listing
    let listed = transport.invoke(channels::LIST, json!(null)).await.unwrap();
    assert_eq!(listed[0]["id"], tools_id);
    assert_eq!(listed[0]["metadata"]["version"], "1.0.0");

    // same backend: identical manager, init not re-run, config ignored
    let again = factory.acquire(moby.clone(), None).await.unwrap();
    assert!(Arc::ptr_eq(&manager, &again));
    assert_eq!(installs.load(Ordering::SeqCst), 1);

    // swapping the backend replaces the manager wholesale
    let kube: Arc<dyn RuntimeClient> = Arc::new(Backend("kube"));
    let replacement = factory
        .acquire(kube, Some(&config_for(&[(tools_id, true)])))
        .await
        .unwrap();
    assert!(!Arc::ptr_eq(&manager, &replacement));
    assert_eq!(installs.load(Ordering::SeqCst), 2);

    // the replacement owns the channels now; its cache answers the listing
    let listed = transport.invoke(channels::LIST, json!(null)).await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // tearing the live manager down silences every channel
    replacement.shutdown().await;
    assert!(transport
        .invoke(channels::HOST_INFO, json!(null))
        .await
        .is_err());
    assert!(transport.invoke(channels::LIST, json!(null)).await.is_err());
}

#[tokio::test]
async fn listing_is_empty_when_no_extension_root_exists() {
    let transport = Arc::new(InProcessTransport::new());
    let factory = ManagerFactory::new(
        transport,
        Arc::new(FakeRegistry::default()),
        PathBuf::from("/nonexistent/extensions"),
    );

    let client: Arc<dyn RuntimeClient> = Arc::new(Backend("moby"));
    let manager = factory
        .acquire(
            client,
            Some(&config_for(&[("registry.example.com/dev/tools", true)])),
        )
        .await
        .unwrap();

    let installed = manager.installed_extensions().await.unwrap();
    assert!(installed.is_empty());
}

#[tokio::test]
async fn reconcile_uninstalls_extensions_marked_false() {
    let transport = Arc::new(InProcessTransport::new());
    let registry = Arc::new(FakeRegistry::default());
    let uninstalls = registry.uninstalls.clone();
    let factory = ManagerFactory::new(transport, registry, PathBuf::from("/nonexistent"));

    let client: Arc<dyn RuntimeClient> = Arc::new(Backend("moby"));
    factory
        .acquire(
            client,
            Some(&config_for(&[
                ("registry.example.com/keep", true),
                ("registry.example.com/drop", false),
            ])),
        )
        .await
        .unwrap();

    assert_eq!(uninstalls.load(Ordering::SeqCst), 1);
}
