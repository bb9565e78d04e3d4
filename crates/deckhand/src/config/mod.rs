//! Configuration consumed by the extension manager, plus the on-disk
//! locations it works against.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use etcetera::{choose_app_strategy, AppStrategy, AppStrategyArgs};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub static APP_STRATEGY: Lazy<AppStrategyArgs> = Lazy::new(|| AppStrategyArgs {
    top_level_domain: "dev".to_string(),
    author: "deckhand".to_string(),
    app_name: "deckhand".to_string(),
});

/// Desired extension state, keyed by extension identifier: `true` means
/// the extension should be installed, `false` that it should be
/// uninstalled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub extensions: HashMap<String, bool>,
}

impl ManagerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config from {}", path.display()))
    }
}

/// Default root for installed extensions; entries under it are named by
/// the directory-safe encoding of each extension identifier.
pub fn default_extension_root() -> PathBuf {
    choose_app_strategy(APP_STRATEGY.clone())
        .map(|strategy| strategy.data_dir().join("extensions"))
        .unwrap_or_else(|_| PathBuf::from(".deckhand/extensions"))
}
