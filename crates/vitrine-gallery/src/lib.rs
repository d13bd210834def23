pub mod favorites;
pub mod filter;
pub mod order;
pub mod pagination;
pub mod state;

pub use favorites::{resolve_entry, Favorites};
pub use filter::{SearchQuery, TagFilter};
pub use order::SortOrder;
pub use pagination::{ChangeSource, PageChange, Pagination, VisibleRange};
pub use state::{GalleryConfig, GalleryItem, GalleryState, GalleryView};
