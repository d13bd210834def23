//! One user's view of one dataset: gallery state, section navigator and the
//! persisted preferences that tie them together across runs.

use std::sync::Arc;
use std::time::Instant;

use vitrine_core::config::AppConfig;
use vitrine_core::{Dataset, Entry, EntryLocation};
use vitrine_gallery::{Favorites, GalleryConfig, GalleryState};
use vitrine_nav::{
    apply_command, DeepLink, MemoryHistory, NavCommand, NavConfig, NavEffect, NavigationController,
};
use vitrine_store::{FavoritesStore, KeyValueStore, PreferenceStore, ViewPreferences};

/// Result of feeding one command through the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub effect: NavEffect,
    /// Set when the command toggled a favorite: where, and the new state.
    pub favorite: Option<(EntryLocation, bool)>,
}

pub struct GallerySession {
    gallery: GalleryState,
    nav: NavigationController,
    history: Arc<MemoryHistory>,
    prefs: PreferenceStore,
    view_prefs: ViewPreferences,
}

impl GallerySession {
    /// Wire a session over `dataset`, restoring the last section and display
    /// switches from `store`.
    pub fn open(config: &AppConfig, dataset: Arc<Dataset>, store: Arc<dyn KeyValueStore>) -> Self {
        let favorites = Favorites::load(
            &dataset.key,
            Arc::new(FavoritesStore::new(Arc::clone(&store))),
        );
        let gallery = GalleryState::new(
            Arc::clone(&dataset),
            GalleryConfig::from(&config.gallery),
            favorites,
        );

        let history = Arc::new(MemoryHistory::new());
        let mut nav = NavigationController::new(
            Arc::clone(&dataset),
            NavConfig::from(&config.navigation),
        )
        .with_history(history.clone());

        let prefs = PreferenceStore::new(store);
        let view_prefs = prefs.load_view(&dataset.key);
        let display = prefs.load_display();

        nav.set_reduced_motion(display.reduced_motion);
        nav.set_deck_open(view_prefs.deck_open);
        if view_prefs.remember_last_section {
            if let Some(section) = view_prefs.last_section {
                let restore = DeepLink {
                    section: Some((section + 1).to_string()),
                    ..Default::default()
                };
                nav.apply_link(&restore);
                tracing::debug!("Restored {} at section {}", dataset.key, nav.current_section());
            }
        }

        Self {
            gallery,
            nav,
            history,
            prefs,
            view_prefs,
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        self.gallery.dataset()
    }

    pub fn gallery(&self) -> &GalleryState {
        &self.gallery
    }

    pub fn gallery_mut(&mut self) -> &mut GalleryState {
        &mut self.gallery
    }

    pub fn nav(&self) -> &NavigationController {
        &self.nav
    }

    pub fn history(&self) -> Vec<String> {
        self.history.entries()
    }

    /// Restore the tag and search recorded by a previous run.
    pub fn resume_view(&mut self) {
        self.gallery.apply_preferences(&self.view_prefs);
    }

    /// The spotlighted entry, if any.
    pub fn spotlighted(&self) -> Option<(EntryLocation, &Entry)> {
        let location = EntryLocation {
            section: self.nav.current_section(),
            slot: self.nav.spotlight()?,
        };
        Some((location, self.dataset().entry_at(location)?))
    }

    /// Apply an incoming link. A spotlighted card is recorded as last viewed
    /// and paged into the gallery view.
    pub fn open_link(&mut self, link: &DeepLink) -> bool {
        let changed = self.nav.apply_link(link);
        self.after_navigation();
        changed
    }

    pub fn handle(&mut self, cmd: NavCommand, now: Instant) -> Step {
        let effect = apply_command(&mut self.nav, cmd, now);
        let mut favorite = None;
        match &effect {
            NavEffect::ToggleFavorite(location) => {
                let url = self.dataset().entry_at(*location).map(|e| e.url.clone());
                if let Some(url) = url {
                    favorite = self.gallery.toggle_favorite(Some(*location), &url);
                }
            }
            NavEffect::SpotlightChanged(_) | NavEffect::LinkApplied => self.after_navigation(),
            NavEffect::DeckChanged(open) => self.view_prefs.deck_open = *open,
            NavEffect::Transitioned(_) | NavEffect::FocusSearch | NavEffect::Unchanged => {}
        }
        Step { effect, favorite }
    }

    fn after_navigation(&mut self) {
        let Some((location, entry)) = self.spotlighted() else {
            return;
        };
        let id = entry.id.clone();
        self.gallery.reveal(location);
        self.view_prefs.last_viewed = Some(id);
    }

    /// Persist the view snapshot. Returns false when storage is unavailable;
    /// the session keeps working in memory either way.
    pub fn save(&mut self) -> bool {
        self.view_prefs.last_section = Some(self.nav.current_section());
        self.view_prefs.deck_open = self.nav.deck_open();
        self.gallery.record_preferences(&mut self.view_prefs);
        let key = self.dataset().key.clone();
        self.prefs.save_view(&key, &self.view_prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vitrine_core::ContentIndex;
    use vitrine_store::MemoryStore;

    const INDEX: &str = r#"{
        "proper": {
            "contentSets": [
                [{"title": "Pulse", "url": "a.html", "tags": ["WebGL"]}, {"title": "Glitch", "url": "b.html", "tags": ["CSS"]}],
                [{"title": "Storm", "url": "c.html", "tags": ["WebGL"]}]
            ],
            "polytopThemes": [
                {"name": "Neural Awakening", "geometry": "hypercube", "density": 8, "rotation": [0,0,0,0], "colors": [0,1,1]},
                {"name": "Quantum Drift", "geometry": "torus", "density": 6, "rotation": [0,0,0,0], "colors": [1,0,1]}
            ]
        }
    }"#;

    fn session(store: Arc<dyn KeyValueStore>) -> GallerySession {
        let dataset = ContentIndex::from_json(INDEX).unwrap().get("proper").unwrap();
        GallerySession::open(&AppConfig::default(), dataset, store)
    }

    #[test]
    fn favorite_follows_spotlight() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut s = session(store.clone());
        let now = Instant::now();

        let step = s.handle(NavCommand::ToggleFavorite, now);
        assert_eq!(step.effect, NavEffect::Unchanged);
        assert!(step.favorite.is_none());

        s.handle(NavCommand::Spotlight(1), now);
        let step = s.handle(NavCommand::ToggleFavorite, now);
        assert_eq!(step.favorite, Some((EntryLocation { section: 0, slot: 1 }, true)));

        let reopened = session(store);
        assert!(reopened.gallery().is_favorite("b.html"));
    }

    #[test]
    fn section_and_view_survive_restart() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut s = session(store.clone());
        let now = Instant::now();
        s.handle(NavCommand::Next, now);
        s.handle(NavCommand::ToggleDeck, now + Duration::from_millis(10));
        s.gallery_mut().toggle_tag("webgl");
        assert!(s.save());

        let mut reopened = session(store);
        assert_eq!(reopened.nav().current_section(), 1);
        assert!(reopened.nav().deck_open());
        assert_eq!(reopened.gallery().active_tag(), None);
        reopened.resume_view();
        assert_eq!(reopened.gallery().active_tag(), Some("webgl"));
        // Restoring never writes history.
        assert!(reopened.history().is_empty());
    }

    #[test]
    fn opening_a_spotlight_link_records_last_viewed() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut s = session(store.clone());
        assert!(s.open_link(&DeepLink::parse("?gallery=proper&section=quantum-drift&wafer=1")));
        assert_eq!(s.nav().current_section(), 1);
        assert_eq!(s.spotlighted().map(|(_, e)| e.title.as_str()), Some("Storm"));
        assert!(s.save());

        let saved = PreferenceStore::new(store).load_view("proper");
        assert_eq!(saved.last_viewed.as_deref(), Some("c"));
        assert_eq!(saved.last_section, Some(1));
    }

    #[test]
    fn unavailable_storage_degrades_to_memory() {
        let mut s = session(Arc::new(MemoryStore::unavailable()));
        let now = Instant::now();
        s.handle(NavCommand::Spotlight(0), now);
        let step = s.handle(NavCommand::ToggleFavorite, now);
        assert_eq!(step.favorite.map(|(_, on)| on), Some(true));
        assert!(s.gallery().is_favorite("a.html"));
        assert!(!s.save());
    }
}
