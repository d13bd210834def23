//! Section/spotlight state machine.
//!
//! All timing is driven by caller-supplied instants, so the controller has no
//! timers of its own: a transition simply blocks further transitions until
//! `transition_settle` has elapsed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use url::Url;
use vitrine_core::config::NavigationSettings;
use vitrine_core::{Dataset, HistorySink};

use crate::deep_link::{build_link, DeepLink};
use crate::history::{HistoryMode, HistorySync};
use crate::momentum::{Momentum, MomentumConfig};

#[derive(Debug, Clone)]
pub struct NavConfig {
    pub momentum: MomentumConfig,
    pub transition_settle: Duration,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self::from(&NavigationSettings::default())
    }
}

impl From<&NavigationSettings> for NavConfig {
    fn from(settings: &NavigationSettings) -> Self {
        Self {
            momentum: MomentumConfig::from(settings),
            transition_settle: Duration::from_millis(settings.transition_settle_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: usize,
    pub to: usize,
}

pub struct NavigationController {
    dataset: Arc<Dataset>,
    transition_settle: Duration,
    current: usize,
    spotlight: Option<usize>,
    transitioning_until: Option<Instant>,
    momentum: Momentum,
    reduced_motion: bool,
    deck_open: bool,
    base: Option<Url>,
    history: Option<HistorySync>,
}

impl NavigationController {
    pub fn new(dataset: Arc<Dataset>, config: NavConfig) -> Self {
        Self {
            dataset,
            transition_settle: config.transition_settle,
            current: 0,
            spotlight: None,
            transitioning_until: None,
            momentum: Momentum::new(config.momentum),
            reduced_motion: false,
            deck_open: false,
            base: None,
            history: None,
        }
    }

    /// Mirror state changes into `sink`.
    pub fn with_history(mut self, sink: Arc<dyn HistorySink>) -> Self {
        self.history = Some(HistorySync::new(sink));
        self
    }

    /// Page URL that generated links are built on. Links are relative
    /// (`?gallery=...#slug`) until one is set.
    pub fn set_base(&mut self, base: Url) {
        self.base = Some(base);
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn section_count(&self) -> usize {
        self.dataset.section_count().max(1)
    }

    pub fn current_section(&self) -> usize {
        self.current
    }

    pub fn spotlight(&self) -> Option<usize> {
        self.spotlight
    }

    pub fn is_transitioning(&self, now: Instant) -> bool {
        self.transitioning_until.is_some_and(|until| now < until)
    }

    pub fn momentum_at(&self, now: Instant) -> f32 {
        self.momentum.value_at(now)
    }

    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    /// Switch between wheel momentum and scroll-position section inference.
    pub fn set_reduced_motion(&mut self, reduced: bool) {
        if self.reduced_motion != reduced {
            tracing::info!("Reduced motion {}", if reduced { "on" } else { "off" });
        }
        self.reduced_motion = reduced;
        self.momentum.reset();
    }

    pub fn deck_open(&self) -> bool {
        self.deck_open
    }

    pub fn set_deck_open(&mut self, open: bool) {
        self.deck_open = open;
    }

    fn last_index(&self) -> usize {
        self.section_count() - 1
    }

    fn filled_slots(&self, section: usize) -> usize {
        self.dataset.section(section).map_or(0, |s| s.filled_slots())
    }

    fn move_to(&mut self, target: usize, now: Instant) -> Transition {
        let transition = Transition {
            from: self.current,
            to: target,
        };
        tracing::debug!("Section transition {} -> {}", transition.from, transition.to);
        self.current = target;
        self.spotlight = None;
        self.momentum.reset();
        self.transitioning_until = Some(now + self.transition_settle);
        self.sync_history(HistoryMode::Push);
        transition
    }

    /// Step by `delta` sections, wrapping at both ends. Rejected while a
    /// previous transition is settling.
    pub fn trigger_transition(&mut self, delta: i32, now: Instant) -> Option<Transition> {
        if self.is_transitioning(now) {
            return None;
        }
        let count = self.section_count() as i64;
        let target = (self.current as i64 + i64::from(delta)).rem_euclid(count) as usize;
        Some(self.move_to(target, now))
    }

    /// Go straight to `index` (clamped). Same guard as `trigger_transition`.
    pub fn jump_to_section(&mut self, index: usize, now: Instant) -> Option<Transition> {
        if self.is_transitioning(now) {
            return None;
        }
        Some(self.move_to(index.min(self.last_index()), now))
    }

    /// Feed a wheel delta. Ignored in reduced-motion mode and while a
    /// transition settles.
    pub fn on_wheel(&mut self, delta_y: f32, now: Instant) -> Option<Transition> {
        if self.reduced_motion || self.is_transitioning(now) {
            return None;
        }
        let direction = self.momentum.accumulate(delta_y, now)?;
        tracing::debug!("Momentum threshold reached, stepping {direction:+}");
        self.trigger_transition(direction, now)
    }

    /// Reduced-motion input: infer the section from the scroll fraction.
    pub fn on_scroll_position(&mut self, fraction: f32) -> Option<Transition> {
        if !self.reduced_motion || !fraction.is_finite() {
            return None;
        }
        let target = (fraction.clamp(0.0, 1.0) * self.last_index() as f32).round() as usize;
        if target == self.current {
            return None;
        }
        let transition = Transition {
            from: self.current,
            to: target,
        };
        self.current = target;
        self.spotlight = None;
        self.sync_history(HistoryMode::Replace);
        Some(transition)
    }

    /// Spotlight `slot`; the same slot again clears it. Slots without a card
    /// clear the spotlight instead.
    pub fn toggle_spotlight(&mut self, slot: usize) -> Option<usize> {
        self.spotlight = if self.spotlight == Some(slot) || slot >= self.filled_slots(self.current)
        {
            None
        } else {
            Some(slot)
        };
        self.sync_history(HistoryMode::Replace);
        self.spotlight
    }

    pub fn clear_spotlight(&mut self) {
        if self.spotlight.take().is_some() {
            self.sync_history(HistoryMode::Replace);
        }
    }

    /// Canonical link for the current state.
    pub fn link(&self) -> String {
        let slug = self
            .dataset
            .section(self.current)
            .map(|s| s.theme.slug())
            .unwrap_or_default();
        build_link(self.base.as_ref(), &self.dataset.key, &slug, self.spotlight)
    }

    fn sync_history(&mut self, mode: HistoryMode) {
        let link = self.link();
        if let Some(history) = self.history.as_mut() {
            history.record(&link, mode);
        }
    }

    /// Apply a link coming from outside (initial load, back/forward). Bypasses
    /// the transition guard and writes nothing back to history.
    pub fn apply_link(&mut self, link: &DeepLink) -> bool {
        let target = link.target(&self.dataset);
        let changed = target.section != self.current || target.spotlight != self.spotlight;
        self.current = target.section;
        self.spotlight = target.spotlight;
        self.momentum.reset();
        let current = self.link();
        if let Some(history) = self.history.as_mut() {
            history.adopt(&current);
        }
        changed
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::history::MemoryHistory;
    use vitrine_core::ContentIndex;

    const INDEX: &str = r#"{
        "proper": {
            "contentSets": [
                [{"title": "A", "url": "a.html"}, {"title": "B", "url": "b.html"}, {"title": "C", "url": "c.html"}],
                [{"title": "D", "url": "d.html"}, {"title": "E", "url": "e.html"}],
                [{"title": "F", "url": "f.html"}]
            ],
            "polytopThemes": [
                {"name": "Neural Awakening", "geometry": "hypercube", "density": 8, "rotation": [0,0,0,0], "colors": [0,1,1]},
                {"name": "Quantum Drift", "geometry": "torus", "density": 6, "rotation": [0,0,0,0], "colors": [1,0,1]},
                {"name": "Crystal Bloom", "geometry": "sphere", "density": 4, "rotation": [0,0,0,0], "colors": [1,1,0]}
            ]
        }
    }"#;

    pub(crate) fn controller() -> NavigationController {
        let dataset = ContentIndex::from_json(INDEX).unwrap().get("proper").unwrap();
        NavigationController::new(dataset, NavConfig::default())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn transitions_wrap_at_both_ends() {
        let mut nav = controller();
        let t0 = Instant::now();
        assert_eq!(
            nav.trigger_transition(-1, t0),
            Some(Transition { from: 0, to: 2 })
        );
        assert_eq!(
            nav.trigger_transition(1, t0 + ms(1_000)),
            Some(Transition { from: 2, to: 0 })
        );
    }

    #[test]
    fn transitions_are_guarded_while_settling() {
        let mut nav = controller();
        let t0 = Instant::now();
        assert!(nav.trigger_transition(1, t0).is_some());
        assert!(nav.is_transitioning(t0 + ms(999)));
        assert_eq!(nav.trigger_transition(1, t0 + ms(500)), None);
        assert_eq!(nav.jump_to_section(2, t0 + ms(500)), None);
        assert_eq!(nav.current_section(), 1);
        assert_eq!(
            nav.jump_to_section(99, t0 + ms(1_000)),
            Some(Transition { from: 1, to: 2 })
        );
    }

    #[test]
    fn wheel_momentum_triggers_one_step() {
        let mut nav = controller();
        let t0 = Instant::now();
        assert_eq!(nav.on_wheel(40.0, t0), None);
        assert_eq!(nav.on_wheel(40.0, t0 + ms(16)), None);
        assert_eq!(
            nav.on_wheel(40.0, t0 + ms(32)),
            Some(Transition { from: 0, to: 1 })
        );
        assert_eq!(nav.momentum_at(t0 + ms(32)), 0.0);

        // Input during the settle window neither moves nor builds momentum.
        for i in 0..10 {
            assert_eq!(nav.on_wheel(200.0, t0 + ms(40 + i * 10)), None);
        }
        assert_eq!(nav.momentum_at(t0 + ms(200)), 0.0);
        assert_eq!(
            nav.on_wheel(-200.0, t0 + ms(1_100)),
            Some(Transition { from: 1, to: 0 })
        );
    }

    #[test]
    fn spotlight_toggles_and_resets_on_transition() {
        let mut nav = controller();
        let t0 = Instant::now();
        assert_eq!(nav.toggle_spotlight(1), Some(1));
        assert_eq!(nav.toggle_spotlight(2), Some(2));
        assert_eq!(nav.toggle_spotlight(2), None);
        nav.toggle_spotlight(0);
        nav.trigger_transition(1, t0);
        assert_eq!(nav.spotlight(), None);

        // Section 1 only fills two slots.
        assert_eq!(nav.toggle_spotlight(2), None);
        assert_eq!(nav.toggle_spotlight(1), Some(1));
    }

    #[test]
    fn reduced_motion_uses_scroll_position() {
        let mut nav = controller();
        let t0 = Instant::now();
        nav.set_reduced_motion(true);
        assert_eq!(nav.on_wheel(500.0, t0), None);
        assert_eq!(nav.on_scroll_position(0.5), Some(Transition { from: 0, to: 1 }));
        assert_eq!(nav.on_scroll_position(0.6), None);
        assert_eq!(nav.on_scroll_position(1.4), Some(Transition { from: 1, to: 2 }));

        nav.set_reduced_motion(false);
        assert_eq!(nav.on_scroll_position(0.0), None);
    }

    #[test]
    fn history_follows_state_but_not_external_links() {
        let history = Arc::new(MemoryHistory::new());
        let mut nav = controller().with_history(history.clone());
        let t0 = Instant::now();

        nav.trigger_transition(1, t0);
        nav.toggle_spotlight(0);
        let entries = history.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with("?gallery=proper&section=quantum-drift&wafer=1#quantum-drift"));

        let changed = nav.apply_link(&DeepLink::parse("?section=crystal-bloom&wafer=1"));
        assert!(changed);
        assert_eq!(nav.current_section(), 2);
        assert_eq!(nav.spotlight(), Some(0));
        assert_eq!(history.entries().len(), 1);

        nav.toggle_spotlight(0);
        assert_eq!(history.entries().len(), 1);
        assert!(history
            .current()
            .unwrap()
            .ends_with("section=crystal-bloom#crystal-bloom"));

        nav.trigger_transition(1, t0 + ms(5_000));
        assert_eq!(history.entries().len(), 2);
    }

    #[test]
    fn link_reflects_state() {
        let mut nav = controller();
        assert!(nav.link().ends_with("?gallery=proper&section=neural-awakening#neural-awakening"));
        nav.toggle_spotlight(2);
        assert!(nav.link().contains("wafer=3"));
    }
}
