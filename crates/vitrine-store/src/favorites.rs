//! Per-dataset favorite URLs, persisted as `{datasetKey: [urls]}`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use crate::traits::{load_json_or_default, persist_json, KeyValueStore};

pub const FAVORITES_KEY: &str = "vitrine:favorites";

type FavoriteMap = BTreeMap<String, BTreeSet<String>>;

/// Favorites backed by a key-value store with an in-memory copy.
///
/// The cache is updated before every write, so a session keeps working
/// favorites even when storage rejects the write.
pub struct FavoritesStore {
    store: Arc<dyn KeyValueStore>,
    cache: RwLock<Option<FavoriteMap>>,
}

impl FavoritesStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(None),
        }
    }

    fn snapshot(&self) -> FavoriteMap {
        if let Ok(cache) = self.cache.read() {
            if let Some(map) = cache.as_ref() {
                return map.clone();
            }
        }
        let raw: BTreeMap<String, serde_json::Value> =
            load_json_or_default(self.store.as_ref(), FAVORITES_KEY);
        let map: FavoriteMap = raw
            .into_iter()
            .filter_map(|(dataset, value)| match serde_json::from_value(value) {
                Ok(urls) => Some((dataset, urls)),
                Err(e) => {
                    tracing::warn!("Discarding corrupt favorites for {dataset}: {e}");
                    None
                }
            })
            .collect();
        if let Ok(mut cache) = self.cache.write() {
            *cache = Some(map.clone());
        }
        map
    }

    /// Favorites for `dataset`; empty when nothing is stored.
    pub fn load(&self, dataset: &str) -> BTreeSet<String> {
        self.snapshot().remove(dataset).unwrap_or_default()
    }

    /// Replace the favorites of `dataset`. Returns whether storage accepted
    /// the write.
    pub fn save(&self, dataset: &str, favorites: &BTreeSet<String>) -> bool {
        let mut map = self.snapshot();
        if favorites.is_empty() {
            map.remove(dataset);
        } else {
            map.insert(dataset.to_string(), favorites.clone());
        }
        if let Ok(mut cache) = self.cache.write() {
            *cache = Some(map.clone());
        }
        persist_json(self.store.as_ref(), FAVORITES_KEY, &map)
    }
}
