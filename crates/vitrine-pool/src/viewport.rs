//! Rectangle intersection with root margins, modelled on the browser's
//! intersection observers.

use std::collections::BTreeMap;

use vitrine_core::CardHandle;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grow (positive) or shrink (negative) on every side.
    pub fn inflate(&self, margin: f32) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            width: (self.width + 2.0 * margin).max(0.0),
            height: (self.height + 2.0 * margin).max(0.0),
        }
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);
        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }

    /// Same rectangle moved down by `dy`.
    pub fn offset_y(&self, dy: f32) -> Rect {
        Rect {
            y: self.y + dy,
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub card: CardHandle,
    pub is_intersecting: bool,
    pub ratio: f32,
    /// First report since the card was observed. Carries the initial state
    /// rather than a transition.
    pub initial: bool,
}

/// Tracks a set of cards against a margin-adjusted viewport and reports
/// only state changes. The first evaluation after `observe` always reports.
#[derive(Debug, Clone)]
pub struct IntersectionObserver {
    margin: f32,
    threshold: f32,
    observed: BTreeMap<CardHandle, Option<bool>>,
}

impl IntersectionObserver {
    pub fn new(margin: f32, threshold: f32) -> Self {
        Self {
            margin,
            threshold: threshold.clamp(0.0, 1.0),
            observed: BTreeMap::new(),
        }
    }

    /// Returns false when the card was already observed.
    pub fn observe(&mut self, card: CardHandle) -> bool {
        if self.observed.contains_key(&card) {
            return false;
        }
        self.observed.insert(card, None);
        true
    }

    pub fn unobserve(&mut self, card: CardHandle) {
        self.observed.remove(&card);
    }

    pub fn disconnect(&mut self) {
        self.observed.clear();
    }

    pub fn is_observing(&self, card: CardHandle) -> bool {
        self.observed.contains_key(&card)
    }

    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    fn measure(&self, root: &Rect, target: &Rect) -> (bool, f32) {
        let Some(overlap) = root.intersection(target) else {
            return (false, 0.0);
        };
        let area = target.area();
        let ratio = if area > 0.0 {
            overlap.area() / area
        } else {
            1.0
        };
        let intersecting = if self.threshold > 0.0 {
            ratio >= self.threshold
        } else {
            true
        };
        (intersecting, ratio)
    }

    /// Compare every observed card with `viewport`. Cards whose bounds are
    /// unknown count as not intersecting.
    pub fn evaluate<F>(&mut self, viewport: Rect, bounds: F) -> Vec<IntersectionEntry>
    where
        F: Fn(CardHandle) -> Option<Rect>,
    {
        let root = viewport.inflate(self.margin);
        let mut changes = Vec::new();
        let measured: Vec<(CardHandle, bool, f32)> = self
            .observed
            .keys()
            .map(|card| {
                let (is_intersecting, ratio) = match bounds(*card) {
                    Some(rect) => self.measure(&root, &rect),
                    None => (false, 0.0),
                };
                (*card, is_intersecting, ratio)
            })
            .collect();
        for (card, is_intersecting, ratio) in measured {
            let last = self.observed.insert(card, Some(is_intersecting)).flatten();
            if last != Some(is_intersecting) {
                changes.push(IntersectionEntry {
                    card,
                    is_intersecting,
                    ratio,
                    initial: last.is_none(),
                });
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: CardHandle = CardHandle(1);

    #[test]
    fn margins_grow_and_shrink_the_root() {
        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        let below = Rect::new(0.0, 650.0, 800.0, 300.0);

        let mut enter = IntersectionObserver::new(100.0, 0.1);
        enter.observe(CARD);
        let changes = enter.evaluate(viewport, |_| Some(below));
        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_intersecting);

        let mut exit = IntersectionObserver::new(-100.0, 0.0);
        exit.observe(CARD);
        let partly_visible = Rect::new(0.0, 550.0, 800.0, 300.0);
        let changes = exit.evaluate(viewport, |_| Some(partly_visible));
        assert!(!changes[0].is_intersecting);
    }

    #[test]
    fn threshold_requires_visible_fraction() {
        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        let mut observer = IntersectionObserver::new(0.0, 0.5);
        observer.observe(CARD);
        let sliver = Rect::new(0.0, 500.0, 800.0, 400.0);
        let changes = observer.evaluate(viewport, |_| Some(sliver));
        assert!(!changes[0].is_intersecting);
        assert!((changes[0].ratio - 0.25).abs() < 1e-6);
    }

    #[test]
    fn only_changes_are_reported() {
        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        let card = Rect::new(0.0, 100.0, 800.0, 200.0);
        let mut observer = IntersectionObserver::new(0.0, 0.0);
        assert!(observer.observe(CARD));
        assert!(!observer.observe(CARD));

        let first = observer.evaluate(viewport, |_| Some(card));
        assert_eq!(first.len(), 1);
        assert!(first[0].initial);
        assert!(observer.evaluate(viewport, |_| Some(card)).is_empty());
        let gone = observer.evaluate(viewport.offset_y(2_000.0), |_| Some(card));
        assert_eq!(gone.len(), 1);
        assert!(!gone[0].is_intersecting);
        assert!(!gone[0].initial);

        observer.disconnect();
        assert!(observer.evaluate(viewport, |_| Some(card)).is_empty());
    }
}
