//! Derived gallery view over one dataset.
//!
//! Every mutation recomputes the filtered, ordered list eagerly; datasets hold
//! tens to low hundreds of entries.

use std::sync::Arc;

use serde::Serialize;
use vitrine_core::config::GallerySettings;
use vitrine_core::{Dataset, Entry, EntryLocation};
use vitrine_store::ViewPreferences;

use crate::favorites::Favorites;
use crate::filter::{SearchQuery, TagFilter};
use crate::order::{compare_titles, shuffle_with_seed, SortOrder};
use crate::pagination::{Pagination, VisibleRange};

#[derive(Debug, Clone)]
pub struct GalleryConfig {
    pub items_per_page: usize,
    pub min_search_chars: usize,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self::from(&GallerySettings::default())
    }
}

impl From<&GallerySettings> for GalleryConfig {
    fn from(settings: &GallerySettings) -> Self {
        Self {
            items_per_page: settings.items_per_page,
            min_search_chars: settings.min_search_chars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryItem {
    pub location: EntryLocation,
    pub entry: Entry,
    pub favorite: bool,
}

/// Snapshot of the current page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryView {
    /// The full filtered list in display order.
    pub items: Vec<GalleryItem>,
    pub range: VisibleRange,
    pub page: usize,
    pub total_pages: usize,
    pub tag: Option<String>,
    pub query: String,
}

impl GalleryView {
    pub fn visible(&self) -> &[GalleryItem] {
        &self.items[self.range.start..self.range.end]
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }
}

pub struct GalleryState {
    dataset: Arc<Dataset>,
    tag: TagFilter,
    search: SearchQuery,
    order: SortOrder,
    pagination: Pagination,
    favorites: Favorites,
    filtered: Vec<EntryLocation>,
}

impl GalleryState {
    pub fn new(dataset: Arc<Dataset>, config: GalleryConfig, favorites: Favorites) -> Self {
        let mut state = Self {
            dataset,
            tag: TagFilter::default(),
            search: SearchQuery::new(config.min_search_chars),
            order: SortOrder::default(),
            pagination: Pagination::new(config.items_per_page),
            favorites,
            filtered: Vec::new(),
        };
        state.recompute();
        state
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    fn recompute(&mut self) {
        let tag = &self.tag;
        let search = &self.search;
        let mut matched: Vec<(EntryLocation, &Entry)> = self
            .dataset
            .entries()
            .filter(|(_, entry)| tag.matches(entry) && search.matches(entry))
            .collect();

        match self.order {
            SortOrder::Title => {
                matched.sort_by(|(la, a), (lb, b)| compare_titles(&a.title, &b.title).then(la.cmp(lb)))
            }
            SortOrder::Shuffled(seed) => shuffle_with_seed(&mut matched, seed),
        }

        self.filtered = matched.into_iter().map(|(location, _)| location).collect();
        self.pagination.set_total(self.filtered.len());
        tracing::debug!(
            "Gallery view: {} of {} entries (tag {:?}, query {:?})",
            self.filtered.len(),
            self.dataset.entry_count(),
            self.tag.active(),
            self.search.normalized()
        );
    }

    /// Recompute after a filter change and return to the first page.
    fn refilter(&mut self) {
        self.pagination.reset();
        self.recompute();
    }

    pub fn active_tag(&self) -> Option<&str> {
        self.tag.active()
    }

    /// Toggle `tag`; selecting the active tag again clears the filter.
    pub fn toggle_tag(&mut self, tag: &str) -> Option<String> {
        let active = self.tag.toggle(tag).map(str::to_string);
        self.refilter();
        active
    }

    pub fn clear_tag_filter(&mut self) {
        self.tag.clear();
        self.refilter();
    }

    pub fn search_query(&self) -> &str {
        self.search.raw()
    }

    pub fn set_search(&mut self, query: &str) {
        self.search.set(query);
        self.refilter();
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
        self.refilter();
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn set_order(&mut self, order: SortOrder) {
        self.order = order;
        self.refilter();
    }

    /// Switch to a freshly seeded shuffle.
    pub fn reshuffle(&mut self) -> SortOrder {
        self.set_order(SortOrder::reshuffled());
        self.order
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.pagination.go_to(page)
    }

    pub fn next_page(&mut self) -> bool {
        self.pagination.next()
    }

    pub fn previous_page(&mut self) -> bool {
        self.pagination.previous()
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    /// Index of `location` in the filtered list.
    pub fn position_of(&self, location: EntryLocation) -> Option<usize> {
        self.filtered.iter().position(|l| *l == location)
    }

    /// Page to `location` if it is filtered in but not on the current page.
    /// Returns whether it is visible afterwards.
    pub fn reveal(&mut self, location: EntryLocation) -> bool {
        let Some(index) = self.position_of(location) else {
            return false;
        };
        if !self.pagination.contains_index(index) {
            self.pagination.go_to_index(index);
        }
        self.pagination.contains_index(index)
    }

    pub fn tags(&self) -> Vec<String> {
        self.dataset.tags()
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn is_favorite(&self, url: &str) -> bool {
        self.favorites.contains(url)
    }

    /// Toggle the favorite of the card at `location` showing `url`.
    pub fn toggle_favorite(
        &mut self,
        location: Option<EntryLocation>,
        url: &str,
    ) -> Option<(EntryLocation, bool)> {
        let dataset = Arc::clone(&self.dataset);
        let result = self.favorites.toggle(&dataset, location, url);
        if result.is_none() {
            tracing::warn!("No entry in {} carries {url}", dataset.key);
        }
        result
    }

    pub fn view(&self) -> GalleryView {
        let items = self
            .filtered
            .iter()
            .filter_map(|location| {
                let entry = self.dataset.entry_at(*location)?;
                Some(GalleryItem {
                    location: *location,
                    favorite: self.favorites.contains(&entry.url),
                    entry: entry.clone(),
                })
            })
            .collect();
        GalleryView {
            items,
            range: self.pagination.visible_range(),
            page: self.pagination.current_page(),
            total_pages: self.pagination.total_pages(),
            tag: self.tag.active().map(str::to_string),
            query: self.search.raw().to_string(),
        }
    }

    /// Restore tag and search from a saved snapshot.
    pub fn apply_preferences(&mut self, prefs: &ViewPreferences) {
        self.tag.set(prefs.last_tag.as_deref());
        self.search.set(&prefs.last_search);
        self.refilter();
    }

    pub fn record_preferences(&self, prefs: &mut ViewPreferences) {
        prefs.last_tag = self.tag.active().map(str::to_string);
        prefs.last_search = self.search.raw().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::ContentIndex;

    const INDEX: &str = r#"{
        "proper": {
            "contentSets": [
                [
                    {"title": "WebGL Framework", "description": "Hypercube core", "tags": ["WebGL", "Core"], "url": "a.html"},
                    {"title": "CSS Glitch", "description": "RGB split", "tags": ["CSS"], "url": "b.html"},
                    {"title": "Aurora", "description": "northern lights", "tags": ["WebGL"], "url": "c.html"}
                ],
                [
                    {"title": "particle storm", "description": "GPU particles", "tags": ["WebGL"], "url": "d.html"},
                    {"title": "Blur Lens", "description": "css filter", "tags": ["css"], "url": "e.html"},
                    {"title": "Mirror", "description": "reflection", "tags": ["Canvas"], "url": "f.html"}
                ]
            ],
            "polytopThemes": [
                {"name": "One", "geometry": "hypercube", "density": 8, "rotation": [0,0,0,0], "colors": [0,1,1]},
                {"name": "Two", "geometry": "torus", "density": 6, "rotation": [0,0,0,0], "colors": [1,0,1]}
            ]
        }
    }"#;

    fn state(per_page: usize) -> GalleryState {
        let dataset = ContentIndex::from_json(INDEX).unwrap().get("proper").unwrap();
        let config = GalleryConfig {
            items_per_page: per_page,
            min_search_chars: 2,
        };
        GalleryState::new(dataset, config, Favorites::in_memory("proper"))
    }

    fn titles(view: &GalleryView) -> Vec<&str> {
        view.items.iter().map(|i| i.entry.title.as_str()).collect()
    }

    #[test]
    fn default_order_is_title_ignoring_case() {
        let view = state(5).view();
        assert_eq!(
            titles(&view),
            vec![
                "Aurora",
                "Blur Lens",
                "CSS Glitch",
                "Mirror",
                "particle storm",
                "WebGL Framework"
            ]
        );
        assert_eq!(view.visible().len(), 5);
        assert_eq!(view.total_pages, 2);
    }

    #[test]
    fn search_matches_title_description_and_tags() {
        let mut gallery = state(10);
        gallery.set_search("fram");
        assert_eq!(titles(&gallery.view()), vec!["WebGL Framework"]);

        // Tags count too: every WebGL-tagged entry contains "we".
        gallery.set_search("We");
        assert_eq!(
            titles(&gallery.view()),
            vec!["Aurora", "particle storm", "WebGL Framework"]
        );

        gallery.set_search("w");
        assert_eq!(gallery.filtered_len(), 6);

        gallery.set_search("CSS");
        assert_eq!(titles(&gallery.view()), vec!["Blur Lens", "CSS Glitch"]);
    }

    #[test]
    fn tag_and_search_combine() {
        let mut gallery = state(10);
        assert_eq!(gallery.toggle_tag("webgl").as_deref(), Some("webgl"));
        assert_eq!(gallery.filtered_len(), 3);
        gallery.set_search("gpu");
        assert_eq!(titles(&gallery.view()), vec!["particle storm"]);

        assert_eq!(gallery.toggle_tag("WebGL"), None);
        assert_eq!(titles(&gallery.view()), vec!["particle storm"]);
        gallery.clear_search();
        assert_eq!(gallery.filtered_len(), 6);
    }

    #[test]
    fn filter_change_returns_to_first_page() {
        let mut gallery = state(2);
        assert!(gallery.go_to_page(2));
        gallery.toggle_tag("css");
        assert_eq!(gallery.pagination().current_page(), 0);
        assert_eq!(gallery.view().range, VisibleRange { start: 0, end: 2 });
    }

    #[test]
    fn reveal_pages_to_a_filtered_entry() {
        let mut gallery = state(2);
        let mirror = EntryLocation { section: 1, slot: 2 };
        assert!(gallery.reveal(mirror));
        assert_eq!(gallery.pagination().current_page(), 1);

        gallery.toggle_tag("css");
        assert!(!gallery.reveal(mirror));
    }

    #[test]
    fn shuffle_is_stable_for_a_seed() {
        let mut gallery = state(10);
        gallery.set_order(SortOrder::Shuffled(99));
        let first = titles(&gallery.view()).join(",");
        gallery.set_search("");
        assert_eq!(titles(&gallery.view()).join(","), first);

        gallery.set_order(SortOrder::Title);
        assert_eq!(titles(&gallery.view())[0], "Aurora");
        assert!(matches!(gallery.reshuffle(), SortOrder::Shuffled(_)));
        assert_eq!(gallery.filtered_len(), 6);
    }

    #[test]
    fn favorites_show_in_the_view() {
        let mut gallery = state(10);
        let result = gallery.toggle_favorite(Some(EntryLocation { section: 0, slot: 1 }), "b.html");
        assert_eq!(result, Some((EntryLocation { section: 0, slot: 1 }, true)));
        let view = gallery.view();
        let glitch = view.items.iter().find(|i| i.entry.url == "b.html").unwrap();
        assert!(glitch.favorite);
        assert!(gallery.toggle_favorite(None, "zzz.html").is_none());
    }

    #[test]
    fn preferences_round_trip_filters() {
        let mut gallery = state(10);
        gallery.toggle_tag("WebGL");
        gallery.set_search("core");
        let mut prefs = ViewPreferences::default();
        gallery.record_preferences(&mut prefs);

        let mut restored = state(10);
        restored.apply_preferences(&prefs);
        assert_eq!(titles(&restored.view()), vec!["WebGL Framework"]);
    }
}
