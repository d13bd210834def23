//! Favorite entries of one dataset.

use std::collections::BTreeSet;
use std::sync::Arc;

use vitrine_core::{Dataset, Entry, EntryLocation};
use vitrine_store::FavoritesStore;

/// Map a card reference back to its canonical entry.
///
/// The entry at `location` wins when it carries `url`. Otherwise the earliest
/// position holding `url` is used, so a favorite stays attached to the same
/// record when the card layout is rebuilt.
pub fn resolve_entry<'a>(
    dataset: &'a Dataset,
    location: Option<EntryLocation>,
    url: &str,
) -> Option<(EntryLocation, &'a Entry)> {
    if let Some(location) = location {
        if let Some(entry) = dataset.entry_at(location) {
            if entry.url == url {
                return Some((location, entry));
            }
        }
    }
    let earliest = dataset.locations_of_url(url).into_iter().min()?;
    dataset.entry_at(earliest).map(|entry| (earliest, entry))
}

pub struct Favorites {
    dataset: String,
    urls: BTreeSet<String>,
    store: Option<Arc<FavoritesStore>>,
}

impl Favorites {
    /// Session-only favorites.
    pub fn in_memory(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            urls: BTreeSet::new(),
            store: None,
        }
    }

    pub fn load(dataset: &str, store: Arc<FavoritesStore>) -> Self {
        let urls = store.load(dataset);
        tracing::debug!("Loaded {} favorites for {dataset}", urls.len());
        Self {
            dataset: dataset.to_string(),
            urls,
            store: Some(store),
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn urls(&self) -> &BTreeSet<String> {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Flip the favorite state of `url`; returns the new state.
    pub fn toggle_url(&mut self, url: &str) -> bool {
        let now_favorite = if self.urls.remove(url) {
            false
        } else {
            self.urls.insert(url.to_string());
            true
        };
        self.persist();
        now_favorite
    }

    /// Resolve a card reference and toggle its entry. `None` when nothing in
    /// the dataset carries `url`.
    pub fn toggle(
        &mut self,
        dataset: &Dataset,
        location: Option<EntryLocation>,
        url: &str,
    ) -> Option<(EntryLocation, bool)> {
        let (resolved, entry) = resolve_entry(dataset, location, url)?;
        let url = entry.url.clone();
        Some((resolved, self.toggle_url(&url)))
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if !store.save(&self.dataset, &self.urls) {
                tracing::warn!("Favorites for {} kept in memory only", self.dataset);
            }
        }
    }
}
