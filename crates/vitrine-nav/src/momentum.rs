//! Wheel momentum: turns a stream of wheel deltas into discrete steps.
//!
//! Deltas accumulate (scaled, capped) until the threshold is crossed. Without
//! further input the value holds for `decay_delay`, then drops by `decay_step`
//! every `decay_interval`. Decay is computed from timestamps on demand.

use std::time::{Duration, Instant};

use vitrine_core::config::NavigationSettings;

#[derive(Debug, Clone)]
pub struct MomentumConfig {
    pub threshold: f32,
    pub max: f32,
    pub accumulation_factor: f32,
    pub decay_step: f32,
    pub decay_interval: Duration,
    pub decay_delay: Duration,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self::from(&NavigationSettings::default())
    }
}

impl From<&NavigationSettings> for MomentumConfig {
    fn from(settings: &NavigationSettings) -> Self {
        Self {
            threshold: settings.momentum_threshold,
            max: settings.momentum_max,
            accumulation_factor: settings.accumulation_factor,
            decay_step: settings.decay_step,
            decay_interval: Duration::from_millis(settings.decay_interval_ms.max(1)),
            decay_delay: Duration::from_millis(settings.decay_delay_ms),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Momentum {
    config: MomentumConfig,
    value: f32,
    last_input: Option<Instant>,
}

impl Momentum {
    pub fn new(config: MomentumConfig) -> Self {
        Self {
            config,
            value: 0.0,
            last_input: None,
        }
    }

    pub fn config(&self) -> &MomentumConfig {
        &self.config
    }

    /// Momentum as of `now`, after decay.
    pub fn value_at(&self, now: Instant) -> f32 {
        let Some(last) = self.last_input else {
            return self.value;
        };
        let idle = now.saturating_duration_since(last);
        if idle < self.config.decay_delay {
            return self.value;
        }
        let ticks = (idle - self.config.decay_delay).as_millis()
            / self.config.decay_interval.as_millis();
        (self.value - ticks as f32 * self.config.decay_step).max(0.0)
    }

    /// Fraction of the threshold reached, for anticipation effects.
    pub fn progress_at(&self, now: Instant) -> f32 {
        if self.config.threshold <= 0.0 {
            return 1.0;
        }
        (self.value_at(now) / self.config.threshold).min(1.0)
    }

    /// Feed one wheel delta. Returns the step direction (+1 or -1) when the
    /// threshold is crossed; the caller resets momentum when it acts on it.
    pub fn accumulate(&mut self, delta: f32, now: Instant) -> Option<i32> {
        let current = self.value_at(now);
        self.value = (current + delta.abs() * self.config.accumulation_factor).min(self.config.max);
        self.last_input = Some(now);
        if self.value >= self.config.threshold {
            Some(if delta > 0.0 { 1 } else { -1 })
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.last_input = None;
    }
}
