//! Contracts between the gallery core and whatever hosts the cards.
//!
//! The pool and loader never touch a UI toolkit directly. Cards are named by
//! opaque handles issued by the host, and every visual change goes through
//! a `PreviewSurface`.

use std::fmt;

use async_trait::async_trait;

use crate::error::CreationError;

/// Opaque identity of one rendered card, issued by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardHandle(pub u64);

impl fmt::Display for CardHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card#{}", self.0)
    }
}

/// Handle to a materialized heavy resource (an embedded preview).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u64);

/// Host side of the preview lifecycle.
///
/// `materialize` resolves once the embed has finished loading; the pool wraps
/// it in its own timeout. The remaining hooks are synchronous view updates.
#[async_trait]
pub trait PreviewSurface: Send + Sync {
    /// Build the embedded preview for `card` from `src`.
    async fn materialize(&self, card: CardHandle, src: &str) -> Result<ResourceId, CreationError>;

    /// Detach and destroy a previously materialized preview.
    fn destroy(&self, card: CardHandle, resource: ResourceId);

    /// Show a loading indicator while `card` occupies slot `slot` of `max`.
    fn show_loading(&self, card: CardHandle, slot: usize, max: usize, queued: usize) {
        let _ = (card, slot, max, queued);
    }

    /// Replace the preview with a direct "open in new tab" affordance.
    fn show_fallback(&self, card: CardHandle, src: &str, error: &CreationError);

    /// Restore the idle placeholder after the preview was released.
    fn show_placeholder(&self, card: CardHandle, src: &str);
}

/// Browser-history side of deep-link sync.
pub trait HistorySink: Send + Sync {
    /// Record a new navigation entry.
    fn push(&self, link: &str);
    /// Rewrite the current entry in place.
    fn replace(&self, link: &str);
}
