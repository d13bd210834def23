//! Bounded admission control for live previews.
//!
//! At most `max_contexts` cards hold a slot at once; a slot is taken as soon
//! as a card is admitted, so previews still loading count against the budget.
//! Admissions are paced by a settle delay so a burst of cards entering the
//! viewport does not create every preview in the same tick.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use vitrine_core::config::PoolSettings;
use vitrine_core::{CardHandle, CreationError, PreviewSurface, ResourceId};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_contexts: usize,
    pub settle_delay: Duration,
    pub load_timeout: Duration,
    pub release_drain_delay: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from(&PoolSettings::default())
    }
}

impl From<&PoolSettings> for PoolConfig {
    fn from(settings: &PoolSettings) -> Self {
        Self {
            // A zero budget would park every card in the queue forever.
            max_contexts: settings.max_contexts.max(1),
            settle_delay: settings.settle_delay(),
            load_timeout: settings.load_timeout(),
            release_drain_delay: settings.release_drain_delay(),
        }
    }
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStatus {
    pub active: usize,
    pub max: usize,
    pub queued: usize,
    pub available: usize,
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pool {}/{} active, {} queued, {} available",
            self.active, self.max, self.queued, self.available
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    /// Materialization in flight. The generation tells a late result apart
    /// from a newer load of the same card.
    Loading { generation: u64 },
    Live(ResourceId),
}

#[derive(Debug)]
struct Slot {
    src: String,
    state: SlotState,
}

#[derive(Default)]
struct PoolInner {
    active: HashMap<CardHandle, Slot>,
    queue: VecDeque<(CardHandle, String)>,
    draining: bool,
    released_src: HashMap<CardHandle, String>,
    next_generation: u64,
}

/// Shared handle to the pool. Clones refer to the same pool.
///
/// Surface hooks are always invoked with the internal lock released.
/// Every mutating call needs a running tokio runtime, since admissions and
/// delayed drains are spawned as tasks.
#[derive(Clone)]
pub struct ContextPool {
    inner: Arc<Mutex<PoolInner>>,
    surface: Arc<dyn PreviewSurface>,
    config: Arc<PoolConfig>,
    status_tx: Arc<watch::Sender<PoolStatus>>,
}

impl ContextPool {
    pub fn new(config: PoolConfig, surface: Arc<dyn PreviewSurface>) -> Self {
        let initial = PoolStatus {
            active: 0,
            max: config.max_contexts,
            queued: 0,
            available: config.max_contexts,
        };
        let (status_tx, _) = watch::channel(initial);
        tracing::info!(
            "Preview pool initialized: max {} contexts",
            config.max_contexts
        );
        Self {
            inner: Arc::new(Mutex::new(PoolInner::default())),
            surface,
            config: Arc::new(config),
            status_tx: Arc::new(status_tx),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        // Critical sections never panic mid-update.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn status_of(&self, inner: &PoolInner) -> PoolStatus {
        let max = self.config.max_contexts;
        PoolStatus {
            active: inner.active.len(),
            max,
            queued: inner.queue.len(),
            available: max.saturating_sub(inner.active.len()),
        }
    }

    pub fn status(&self) -> PoolStatus {
        let inner = self.lock();
        self.status_of(&inner)
    }

    /// Receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<PoolStatus> {
        self.status_tx.subscribe()
    }

    fn publish(&self) {
        let status = self.status();
        self.status_tx.send_replace(status);
    }

    /// Request a live preview for `card`.
    ///
    /// No-op while the card already holds a slot or waits in the queue.
    pub fn enqueue(&self, card: CardHandle, src: impl Into<String>) {
        {
            let mut inner = self.lock();
            if inner.active.contains_key(&card) {
                tracing::debug!("{card} already holds a preview slot");
                return;
            }
            if inner.queue.iter().any(|(queued, _)| *queued == card) {
                tracing::debug!("{card} already queued");
                return;
            }
            inner.released_src.remove(&card);
            inner.queue.push_back((card, src.into()));
            tracing::debug!(
                "Queued {card}: {} pending, {} active",
                inner.queue.len(),
                inner.active.len()
            );
        }
        self.publish();
        self.drain();
    }

    /// Admit the queue head if capacity allows and no admission is settling.
    pub fn drain(&self) {
        let (card, src, generation, slot, queued) = {
            let mut inner = self.lock();
            if inner.draining || inner.queue.is_empty() {
                return;
            }
            if inner.active.len() >= self.config.max_contexts {
                tracing::debug!(
                    "Context limit reached ({}), waiting for release",
                    self.config.max_contexts
                );
                return;
            }
            let Some((card, src)) = inner.queue.pop_front() else {
                return;
            };
            inner.draining = true;
            inner.next_generation += 1;
            let generation = inner.next_generation;
            inner.active.insert(
                card,
                Slot {
                    src: src.clone(),
                    state: SlotState::Loading { generation },
                },
            );
            let slot = inner.active.len();
            (card, src, generation, slot, inner.queue.len())
        };

        tracing::debug!(
            "Loading {card} into slot {slot}/{}",
            self.config.max_contexts
        );
        self.publish();
        self.surface
            .show_loading(card, slot, self.config.max_contexts, queued);

        let pool = self.clone();
        tokio::spawn(async move {
            let timeout = pool.config.load_timeout;
            let outcome =
                match tokio::time::timeout(timeout, pool.surface.materialize(card, &src)).await {
                    Ok(result) => result,
                    Err(_) => Err(CreationError::Timeout(timeout)),
                };
            pool.settle(card, generation, &src, outcome);
        });

        let pool = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(pool.config.settle_delay).await;
            pool.lock().draining = false;
            pool.drain();
        });
    }

    fn settle(
        &self,
        card: CardHandle,
        generation: u64,
        src: &str,
        outcome: Result<ResourceId, CreationError>,
    ) {
        enum Action {
            Keep,
            Destroy(ResourceId),
            Fallback(CreationError),
            Ignore,
        }

        let action = {
            let mut inner = self.lock();
            let current = matches!(
                inner.active.get(&card),
                Some(slot) if slot.state == SlotState::Loading { generation }
            );
            match (current, outcome) {
                (true, Ok(resource)) => {
                    if let Some(slot) = inner.active.get_mut(&card) {
                        slot.state = SlotState::Live(resource);
                    }
                    Action::Keep
                }
                (true, Err(error)) => {
                    inner.active.remove(&card);
                    Action::Fallback(error)
                }
                (false, Ok(resource)) => Action::Destroy(resource),
                (false, Err(_)) => Action::Ignore,
            }
        };

        match action {
            Action::Keep => {
                let status = self.status();
                tracing::info!(
                    "Preview live for {card}: {}/{} active",
                    status.active,
                    status.max
                );
            }
            Action::Destroy(resource) => {
                tracing::debug!("Late preview for released {card}, destroying");
                self.surface.destroy(card, resource);
            }
            Action::Fallback(error) => {
                tracing::warn!("Preview for {card} unavailable ({src}): {error}");
                self.surface.show_fallback(card, src, &error);
                self.publish();
                self.drain();
            }
            Action::Ignore => {}
        }
    }

    /// Tear down the preview held by `card` and free its slot.
    ///
    /// Returns false (doing nothing) when the card holds no slot. A load
    /// still in flight is abandoned; its eventual result is discarded.
    pub fn release(&self, card: CardHandle) -> bool {
        let slot = {
            let mut inner = self.lock();
            let Some(slot) = inner.active.remove(&card) else {
                return false;
            };
            inner.released_src.insert(card, slot.src.clone());
            slot
        };

        if let SlotState::Live(resource) = slot.state {
            self.surface.destroy(card, resource);
        }
        self.surface.show_placeholder(card, &slot.src);
        self.publish();

        let status = self.status();
        tracing::debug!(
            "Released {card}: {}/{} active, {} in queue",
            status.active,
            status.max,
            status.queued
        );

        let pool = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(pool.config.release_drain_delay).await;
            pool.drain();
        });
        true
    }

    /// Drop a pending request for `card`, returning its source.
    pub fn withdraw(&self, card: CardHandle) -> Option<String> {
        let src = {
            let mut inner = self.lock();
            let position = inner.queue.iter().position(|(queued, _)| *queued == card)?;
            inner.queue.remove(position).map(|(_, src)| src)
        };
        tracing::debug!("Withdrew queued {card}");
        self.publish();
        src
    }

    /// Source recorded for `card` at its last release, if not yet reclaimed.
    pub fn take_released_src(&self, card: CardHandle) -> Option<String> {
        self.lock().released_src.remove(&card)
    }

    /// Release every slot and clear the queue.
    pub fn reset(&self) {
        let slots: Vec<(CardHandle, Slot)> = {
            let mut inner = self.lock();
            inner.queue.clear();
            inner.released_src.clear();
            inner.active.drain().collect()
        };
        for (card, slot) in &slots {
            if let SlotState::Live(resource) = slot.state {
                self.surface.destroy(*card, resource);
            }
            self.surface.show_placeholder(*card, &slot.src);
        }
        self.publish();
        tracing::info!("Preview pool reset, {} slots released", slots.len());
    }

    pub fn is_active(&self, card: CardHandle) -> bool {
        self.lock().active.contains_key(&card)
    }

    pub fn is_live(&self, card: CardHandle) -> bool {
        matches!(
            self.lock().active.get(&card),
            Some(Slot {
                state: SlotState::Live(_),
                ..
            })
        )
    }

    pub fn is_queued(&self, card: CardHandle) -> bool {
        self.lock().queue.iter().any(|(queued, _)| *queued == card)
    }

    /// Cards holding a slot, in handle order.
    pub fn active_cards(&self) -> Vec<CardHandle> {
        let mut cards: Vec<_> = self.lock().active.keys().copied().collect();
        cards.sort();
        cards
    }

    /// Queued cards, head first.
    pub fn queued_cards(&self) -> Vec<CardHandle> {
        self.lock().queue.iter().map(|(card, _)| *card).collect()
    }
}
