pub mod config;
pub mod content;
pub mod error;
pub mod interfaces;
pub mod lifecycle;

pub use content::{ContentIndex, ContentSection, Dataset, Entry, EntryLocation, Theme};
pub use error::{ContentError, ContentResult, CreationError};
pub use interfaces::{CardHandle, HistorySink, PreviewSurface, ResourceId};
