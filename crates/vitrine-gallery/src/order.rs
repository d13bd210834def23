//! View ordering: alphabetical by default, or a seeded shuffle.

use std::cmp::Ordering;

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Title,
    /// Deterministic shuffle keyed by the seed.
    Shuffled(u32),
}

impl SortOrder {
    /// Shuffle with a freshly drawn seed.
    pub fn reshuffled() -> Self {
        SortOrder::Shuffled(rand::rng().next_u32())
    }
}

/// Case-insensitive title comparison with a stable tiebreak on the exact text.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// mulberry32: tiny 32-bit PRNG yielding floats in `[0, 1)`.
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6d2b_79f5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        f64::from(t ^ (t >> 14)) / 4_294_967_296.0
    }
}

/// Fisher-Yates over `items`, driven by mulberry32.
pub fn shuffle_with_seed<T>(items: &mut [T], seed: u32) {
    let mut rng = Mulberry32::new(seed);
    for i in (1..items.len()).rev() {
        let j = (rng.next_f64() * (i + 1) as f64) as usize;
        items.swap(i, j.min(i));
    }
}
