pub mod loader;
pub mod pool;
pub mod viewport;

pub use loader::{LazyLoader, LoaderConfig, LoaderReport};
pub use pool::{ContextPool, PoolConfig, PoolStatus};
pub use viewport::{IntersectionEntry, IntersectionObserver, Rect};
