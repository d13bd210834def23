use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use vitrine_core::config::AppConfig;
use vitrine_core::{ContentIndex, Dataset};
use vitrine_store::{JsonFileStore, KeyValueStore};

/// Content index location: `--data` wins over the configured path.
pub fn index_path(config: &AppConfig, data: Option<&Path>) -> PathBuf {
    data.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.gallery.index_path))
}

pub fn load_index(config: &AppConfig, data: Option<&Path>) -> Result<ContentIndex> {
    let path = index_path(config, data);
    let index = ContentIndex::load(&path)
        .with_context(|| format!("loading content index {}", path.display()))?;
    if !index.issues().is_empty() {
        tracing::info!(
            "Content index {} loaded with {} issue(s)",
            path.display(),
            index.issues().len()
        );
    }
    Ok(index)
}

/// Pick the dataset for a command, falling back to the configured default.
pub fn resolve_dataset(
    config: &AppConfig,
    index: &ContentIndex,
    requested: Option<&str>,
) -> Result<Arc<Dataset>> {
    index
        .resolve(requested, None, &config.gallery.default_dataset)
        .context("content index has no datasets")
}

/// Persistent key-value store backing favorites and preferences.
pub fn open_store(config: &AppConfig) -> Arc<dyn KeyValueStore> {
    Arc::new(JsonFileStore::open(&config.storage.path))
}
