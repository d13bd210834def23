//! Headless preview host used by `vitrine simulate`.
//!
//! Cards are laid out in one column in dataset order. Previews "load" after a
//! fixed latency. Entries marked `status: "broken"` fail, and `"denied"`
//! entries are refused a context; both fall back to a direct link.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vitrine_core::{CardHandle, CreationError, Dataset, Entry, EntryLocation, PreviewSurface, ResourceId};
use vitrine_pool::Rect;

pub const CARD_HEIGHT: f32 = 300.0;
pub const CARD_GAP: f32 = 100.0;
pub const CARD_WIDTH: f32 = 400.0;

/// One card in the simulated column.
#[derive(Debug, Clone)]
pub struct PlacedCard {
    pub handle: CardHandle,
    pub location: EntryLocation,
    pub bounds: Rect,
    pub src: String,
    pub poolable: bool,
}

/// Column layout of every entry in `dataset`.
pub fn layout(dataset: &Dataset) -> Vec<PlacedCard> {
    dataset
        .entries()
        .enumerate()
        .map(|(i, (location, entry))| PlacedCard {
            handle: CardHandle(i as u64),
            location,
            bounds: Rect::new(0.0, i as f32 * (CARD_HEIGHT + CARD_GAP), CARD_WIDTH, CARD_HEIGHT),
            src: entry.url.clone(),
            poolable: entry.is_poolable(),
        })
        .collect()
}

pub fn column_height(cards: &[PlacedCard]) -> f32 {
    cards
        .last()
        .map_or(0.0, |card| card.bounds.y + card.bounds.height)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Broken,
    Denied,
}

fn failure_of(entry: &Entry) -> Option<Failure> {
    let status = entry.status.as_deref()?;
    if status.eq_ignore_ascii_case("broken") {
        Some(Failure::Broken)
    } else if status.eq_ignore_ascii_case("denied") {
        Some(Failure::Denied)
    } else {
        None
    }
}

/// Counters exposed after a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceStats {
    pub loaded: usize,
    pub destroyed: usize,
    pub fallbacks: usize,
}

pub struct SimulatedSurface {
    latency: Duration,
    failing: HashMap<String, Failure>,
    next_resource: AtomicU64,
    live: Mutex<HashMap<CardHandle, ResourceId>>,
    loaded: AtomicUsize,
    destroyed: AtomicUsize,
    fallbacks: AtomicUsize,
}

impl SimulatedSurface {
    pub fn new(dataset: &Dataset, latency: Duration) -> Self {
        let failing = dataset
            .entries()
            .filter_map(|(_, entry)| Some((entry.url.clone(), failure_of(entry)?)))
            .collect();
        Self {
            latency,
            failing,
            next_resource: AtomicU64::new(1),
            live: Mutex::new(HashMap::new()),
            loaded: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
            fallbacks: AtomicUsize::new(0),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    pub fn stats(&self) -> SurfaceStats {
        SurfaceStats {
            loaded: self.loaded.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl PreviewSurface for SimulatedSurface {
    async fn materialize(&self, card: CardHandle, src: &str) -> Result<ResourceId, CreationError> {
        tokio::time::sleep(self.latency).await;
        match self.failing.get(src) {
            Some(Failure::Broken) => {
                return Err(CreationError::Failed(format!("{src} did not load")));
            }
            Some(Failure::Denied) => {
                return Err(CreationError::Denied(format!("no context available for {src}")));
            }
            None => {}
        }
        let resource = ResourceId(self.next_resource.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut live) = self.live.lock() {
            live.insert(card, resource);
        }
        self.loaded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("{card} preview live ({src})");
        Ok(resource)
    }

    fn destroy(&self, card: CardHandle, resource: ResourceId) {
        if let Ok(mut live) = self.live.lock() {
            if live.get(&card) == Some(&resource) {
                live.remove(&card);
            }
        }
        self.destroyed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("{card} preview destroyed");
    }

    fn show_loading(&self, card: CardHandle, slot: usize, max: usize, queued: usize) {
        tracing::debug!("{card} loading ({slot}/{max} active, {queued} queued)");
    }

    fn show_fallback(&self, card: CardHandle, src: &str, error: &CreationError) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::info!("{card} fallback: open {src} directly ({error})");
    }

    fn show_placeholder(&self, card: CardHandle, src: &str) {
        tracing::debug!("{card} back to placeholder ({src})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::ContentIndex;

    const INDEX: &str = r#"{
        "proper": {
            "contentSets": [
                [{"title": "A", "url": "a.html"}, {"title": "B", "url": "b.html", "status": "broken"}, {"title": "C", "url": "c.html", "status": "denied"}],
                [{"title": "Mega", "url": "mega.html", "isHeavy": true}]
            ],
            "polytopThemes": [
                {"name": "One", "geometry": "hypercube", "density": 8, "rotation": [0,0,0,0], "colors": [0,1,1]},
                {"name": "Two", "geometry": "torus", "density": 6, "rotation": [0,0,0,0], "colors": [1,0,1]}
            ]
        }
    }"#;

    fn dataset() -> std::sync::Arc<Dataset> {
        ContentIndex::from_json(INDEX).unwrap().get("proper").unwrap()
    }

    #[test]
    fn layout_stacks_cards_and_marks_heavy_entries() {
        let cards = layout(&dataset());
        assert_eq!(cards.len(), 4);
        assert_eq!(cards[1].bounds.y, CARD_HEIGHT + CARD_GAP);
        assert_eq!(cards[3].location, EntryLocation { section: 1, slot: 0 });
        assert!(cards[0].poolable);
        assert!(!cards[3].poolable);
        assert_eq!(column_height(&cards), 3.0 * (CARD_HEIGHT + CARD_GAP) + CARD_HEIGHT);
    }

    #[tokio::test(start_paused = true)]
    async fn broken_and_denied_entries_fail_and_live_ones_are_tracked() {
        let surface = SimulatedSurface::new(&dataset(), Duration::from_millis(50));
        let ok = surface.materialize(CardHandle(0), "a.html").await.unwrap();
        assert_eq!(surface.live_count(), 1);
        let err = surface.materialize(CardHandle(1), "b.html").await.unwrap_err();
        assert!(matches!(err, CreationError::Failed(_)));
        let err = surface.materialize(CardHandle(2), "c.html").await.unwrap_err();
        assert!(matches!(err, CreationError::Denied(_)));
        assert_eq!(surface.live_count(), 1);

        surface.destroy(CardHandle(0), ok);
        assert_eq!(surface.live_count(), 0);
        assert_eq!(
            surface.stats(),
            SurfaceStats {
                loaded: 1,
                destroyed: 1,
                fallbacks: 0
            }
        );
    }
}
