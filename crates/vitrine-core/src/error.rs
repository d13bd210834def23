use std::time::Duration;

use thiserror::Error;

/// Problems found while loading the static content index.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Malformed content index: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read content index: {0}")]
    Io(#[from] std::io::Error),

    #[error("{context}: missing required field `{field}`")]
    MissingField { context: String, field: &'static str },

    #[error("{context}: invalid value for `{field}`")]
    InvalidField { context: String, field: &'static str },

    #[error("Theme {name:?}: {reason}")]
    InvalidTheme { name: String, reason: String },

    #[error("Dataset {dataset:?}: {themes} themes but {sets} content sets")]
    SectionMismatch {
        dataset: String,
        themes: usize,
        sets: usize,
    },

    #[error(
        "Dataset {dataset:?}: {sections} sections carry more than {slots} entries; \
         the extras appear in the gallery view only"
    )]
    OverfullSections {
        dataset: String,
        sections: usize,
        slots: usize,
    },

    #[error("Dataset {0:?} has no usable sections")]
    EmptyDataset(String),

    #[error("Content index contains no datasets")]
    EmptyIndex,
}

pub type ContentResult<T> = Result<T, ContentError>;

/// Why a live preview could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreationError {
    #[error("Preview failed to load: {0}")]
    Failed(String),

    #[error("Preview context denied: {0}")]
    Denied(String),

    #[error("Preview load timed out after {0:?}")]
    Timeout(Duration),
}
