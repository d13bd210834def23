//! Bridges card visibility to the pool.
//!
//! The loader never creates or destroys previews itself. Entering the preload
//! zone enqueues a card; leaving the inner zone releases it; leaving the
//! preload zone entirely also withdraws a request that was never admitted.

use std::collections::HashMap;

use vitrine_core::config::LoaderSettings;
use vitrine_core::CardHandle;

use crate::pool::ContextPool;
use crate::viewport::{IntersectionObserver, Rect};

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub enter_margin: f32,
    pub exit_margin: f32,
    pub enter_threshold: f32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::from(&LoaderSettings::default())
    }
}

impl From<&LoaderSettings> for LoaderConfig {
    fn from(settings: &LoaderSettings) -> Self {
        Self {
            enter_margin: settings.enter_margin_px,
            exit_margin: settings.exit_margin_px,
            enter_threshold: settings.enter_threshold,
        }
    }
}

/// What one evaluation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderReport {
    pub enqueued: Vec<CardHandle>,
    pub released: Vec<CardHandle>,
    pub withdrawn: Vec<CardHandle>,
}

impl LoaderReport {
    pub fn is_empty(&self) -> bool {
        self.enqueued.is_empty() && self.released.is_empty() && self.withdrawn.is_empty()
    }
}

pub struct LazyLoader {
    pool: ContextPool,
    enter: IntersectionObserver,
    exit: IntersectionObserver,
    /// Source annotations not yet handed to the pool.
    pending: HashMap<CardHandle, String>,
}

impl LazyLoader {
    pub fn new(config: LoaderConfig, pool: ContextPool) -> Self {
        Self {
            pool,
            enter: IntersectionObserver::new(config.enter_margin, config.enter_threshold),
            exit: IntersectionObserver::new(config.exit_margin, 0.0),
            pending: HashMap::new(),
        }
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    /// Attach the source a card should load once it becomes visible.
    pub fn annotate(&mut self, card: CardHandle, src: impl Into<String>) {
        self.pending.insert(card, src.into());
    }

    pub fn pending_src(&self, card: CardHandle) -> Option<&str> {
        self.pending.get(&card).map(String::as_str)
    }

    /// Register `card` with both observers. Idempotent.
    pub fn observe_card(&mut self, card: CardHandle) {
        let added = self.enter.observe(card);
        self.exit.observe(card);
        if added {
            tracing::trace!("Observing {card}");
        }
    }

    pub fn observe_all(&mut self, cards: impl IntoIterator<Item = CardHandle>) {
        for card in cards {
            self.observe_card(card);
        }
    }

    pub fn is_observing(&self, card: CardHandle) -> bool {
        self.enter.is_observing(card)
    }

    pub fn observed_count(&self) -> usize {
        self.enter.len()
    }

    /// Stop observing everything and forget pending annotations. Used before
    /// the card set is rebuilt, so no stale handle reaches the pool.
    pub fn disconnect(&mut self) {
        self.enter.disconnect();
        self.exit.disconnect();
        self.pending.clear();
        tracing::debug!("Lazy loader disconnected");
    }

    /// Feed the current viewport through both observers and forward the
    /// resulting transitions to the pool.
    pub fn evaluate<F>(&mut self, viewport: Rect, bounds: F) -> LoaderReport
    where
        F: Fn(CardHandle) -> Option<Rect>,
    {
        let mut report = LoaderReport::default();

        for entry in self.enter.evaluate(viewport, &bounds) {
            let card = entry.card;
            if entry.is_intersecting {
                let src = self
                    .pending
                    .remove(&card)
                    .or_else(|| self.pool.take_released_src(card));
                match src {
                    Some(src) => {
                        tracing::debug!("{card} entering view, queueing {src}");
                        self.pool.enqueue(card, src);
                        report.enqueued.push(card);
                    }
                    None => tracing::debug!("{card} entering view without a pending source"),
                }
            } else if let Some(src) = self.pool.withdraw(card) {
                self.pending.insert(card, src);
                report.withdrawn.push(card);
            } else if self.pool.release(card) {
                report.released.push(card);
            }
        }

        // An initial "outside" report from the inner zone is not a departure;
        // the card may still sit in the preload band.
        for entry in self.exit.evaluate(viewport, &bounds) {
            if !entry.is_intersecting && !entry.initial && self.pool.release(entry.card) {
                report.released.push(entry.card);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::tests::{advance, pool_with};

    const CARD_HEIGHT: f32 = 300.0;

    /// Cards stacked vertically, one per 400px row.
    fn layout(card: CardHandle) -> Option<Rect> {
        Some(Rect::new(0.0, card.0 as f32 * 400.0, 800.0, CARD_HEIGHT))
    }

    fn viewport_at(scroll: f32) -> Rect {
        Rect::new(0.0, scroll, 800.0, 600.0)
    }

    fn loader_with(max: usize, cards: u64) -> LazyLoader {
        let (pool, _surface) = pool_with(max);
        let mut loader = LazyLoader::new(LoaderConfig::default(), pool);
        for i in 0..cards {
            loader.annotate(CardHandle(i), format!("demo-{i}.html"));
            loader.observe_card(CardHandle(i));
        }
        loader
    }

    #[tokio::test(start_paused = true)]
    async fn visible_cards_are_enqueued_once() {
        let mut loader = loader_with(6, 6);
        let report = loader.evaluate(viewport_at(0.0), layout);
        // Preload zone spans -100..700; row 2 starts at 800.
        assert_eq!(report.enqueued, vec![CardHandle(0), CardHandle(1)]);
        assert!(loader.pending_src(CardHandle(0)).is_none());

        let again = loader.evaluate(viewport_at(0.0), layout);
        assert!(again.enqueued.is_empty());
        advance(2_000).await;
        assert_eq!(loader.pool().status().active, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn scrolling_away_releases_and_scrolling_back_reloads() {
        let mut loader = loader_with(6, 10);
        loader.evaluate(viewport_at(0.0), layout);
        advance(2_000).await;
        assert!(loader.pool().is_live(CardHandle(0)));

        let report = loader.evaluate(viewport_at(2_000.0), layout);
        assert!(report.released.contains(&CardHandle(0)));
        assert!(report.released.contains(&CardHandle(1)));
        advance(2_000).await;
        assert!(!loader.pool().is_active(CardHandle(0)));

        let back = loader.evaluate(viewport_at(0.0), layout);
        assert!(back.enqueued.contains(&CardHandle(0)));
        advance(2_000).await;
        assert!(loader.pool().is_live(CardHandle(0)));
    }

    #[tokio::test(start_paused = true)]
    async fn card_first_seen_in_preload_band_stays_loaded() {
        let mut loader = loader_with(6, 4);
        // Inner zone ends at 350, preload zone at 550: row 1 (400..700) is
        // only in the preload band.
        let report = loader.evaluate(Rect::new(0.0, -150.0, 800.0, 600.0), layout);
        assert!(report.enqueued.contains(&CardHandle(1)));
        assert!(report.released.is_empty());

        loader.evaluate(viewport_at(300.0), layout);
        advance(2_000).await;
        assert!(loader.pool().is_live(CardHandle(1)));

        // Leaving the inner zone after having been inside it still releases.
        let away = loader.evaluate(viewport_at(-550.0), layout);
        assert!(away.released.contains(&CardHandle(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_scroll_withdraws_unadmitted_requests() {
        let mut loader = loader_with(1, 10);
        let first = loader.evaluate(viewport_at(0.0), layout);
        assert_eq!(first.enqueued.len(), 2);
        assert!(loader.pool().is_queued(CardHandle(1)));

        let report = loader.evaluate(viewport_at(3_000.0), layout);
        assert_eq!(report.withdrawn, vec![CardHandle(1)]);
        assert_eq!(loader.pending_src(CardHandle(1)), Some("demo-1.html"));
        assert!(!loader.pool().is_queued(CardHandle(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn observe_is_idempotent_and_disconnect_clears() {
        let mut loader = loader_with(6, 3);
        loader.observe_all([CardHandle(0), CardHandle(1), CardHandle(2)]);
        assert_eq!(loader.observed_count(), 3);

        loader.disconnect();
        assert_eq!(loader.observed_count(), 0);
        assert!(loader.evaluate(viewport_at(0.0), layout).is_empty());
        assert_eq!(loader.pool().status().queued, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn card_without_source_is_skipped() {
        let (pool, _surface) = pool_with(6);
        let mut loader = LazyLoader::new(LoaderConfig::default(), pool);
        loader.observe_card(CardHandle(0));
        let report = loader.evaluate(viewport_at(0.0), layout);
        assert!(report.enqueued.is_empty());
        assert_eq!(loader.pool().status().queued + loader.pool().status().active, 0);
    }
}
