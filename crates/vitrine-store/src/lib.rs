pub mod error;
pub mod favorites;
pub mod file;
pub mod mock;
pub mod preferences;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use favorites::FavoritesStore;
pub use file::JsonFileStore;
pub use mock::MemoryStore;
pub use preferences::{DisplayPreferences, PreferenceStore, ViewPreferences};
pub use traits::KeyValueStore;
