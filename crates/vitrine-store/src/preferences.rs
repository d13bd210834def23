//! View and display preference snapshots.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::{load_json_or_default, persist_json, KeyValueStore};

pub const VIEW_PREFS_KEY: &str = "vitrine:view-prefs";
pub const DISPLAY_PREFS_KEY: &str = "vitrine:display-prefs";

/// Per-dataset gallery view snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewPreferences {
    pub remember_last_section: bool,
    pub last_section: Option<usize>,
    pub last_tag: Option<String>,
    pub last_search: String,
    pub deck_open: bool,
    /// Id of the most recently opened entry.
    pub last_viewed: Option<String>,
    pub saved_at: Option<DateTime<Utc>>,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            remember_last_section: true,
            last_section: None,
            last_tag: None,
            last_search: String::new(),
            deck_open: false,
            last_viewed: None,
            saved_at: None,
        }
    }
}

/// Global accessibility and telemetry switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayPreferences {
    pub reduced_motion: bool,
    pub high_contrast: bool,
    pub telemetry: bool,
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self {
            reduced_motion: false,
            high_contrast: false,
            telemetry: true,
        }
    }
}

pub struct PreferenceStore {
    store: Arc<dyn KeyValueStore>,
}

impl PreferenceStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Raw per-dataset map. Each dataset entry is decoded on its own so one
    /// corrupt snapshot does not discard the others.
    fn view_map(&self) -> BTreeMap<String, serde_json::Value> {
        load_json_or_default(self.store.as_ref(), VIEW_PREFS_KEY)
    }

    pub fn load_view(&self, dataset: &str) -> ViewPreferences {
        match self.view_map().remove(dataset) {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!("Discarding corrupt view preferences for {dataset}: {e}");
                ViewPreferences::default()
            }),
            None => ViewPreferences::default(),
        }
    }

    /// Stamp and persist `prefs` for `dataset`.
    pub fn save_view(&self, dataset: &str, prefs: &ViewPreferences) -> bool {
        let mut stamped = prefs.clone();
        stamped.saved_at = Some(Utc::now());
        let value = match serde_json::to_value(&stamped) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to encode view preferences: {e}");
                return false;
            }
        };
        let mut map = self.view_map();
        map.insert(dataset.to_string(), value);
        persist_json(self.store.as_ref(), VIEW_PREFS_KEY, &map)
    }

    pub fn load_display(&self) -> DisplayPreferences {
        load_json_or_default(self.store.as_ref(), DISPLAY_PREFS_KEY)
    }

    pub fn save_display(&self, prefs: &DisplayPreferences) -> bool {
        persist_json(self.store.as_ref(), DISPLAY_PREFS_KEY, prefs)
    }
}
