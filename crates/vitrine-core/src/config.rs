use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub loader: LoaderSettings,
    #[serde(default)]
    pub gallery: GallerySettings,
    #[serde(default)]
    pub navigation: NavigationSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Admission limits for live preview contexts.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    /// Maximum number of concurrently live previews.
    #[serde(default = "default_max_contexts")]
    pub max_contexts: usize,
    /// Pause between two successive admissions.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Upper bound for a single preview to finish loading.
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,
    /// Delay before the queue is drained again after a release.
    #[serde(default = "default_release_drain_delay_ms")]
    pub release_drain_delay_ms: u64,
}

fn default_max_contexts() -> usize {
    6
}
fn default_settle_delay_ms() -> u64 {
    500
}
fn default_load_timeout_ms() -> u64 {
    10_000
}
fn default_release_drain_delay_ms() -> u64 {
    100
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_contexts: default_max_contexts(),
            settle_delay_ms: default_settle_delay_ms(),
            load_timeout_ms: default_load_timeout_ms(),
            release_drain_delay_ms: default_release_drain_delay_ms(),
        }
    }
}

impl PoolSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn release_drain_delay(&self) -> Duration {
        Duration::from_millis(self.release_drain_delay_ms)
    }
}

/// Viewport margins for the enter/exit observers.
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderSettings {
    /// Positive margin: cards start loading before they are on screen.
    #[serde(default = "default_enter_margin")]
    pub enter_margin_px: f32,
    /// Negative margin: cards are released only once well outside the view.
    #[serde(default = "default_exit_margin")]
    pub exit_margin_px: f32,
    /// Visible fraction required to count as entered.
    #[serde(default = "default_enter_threshold")]
    pub enter_threshold: f32,
}

fn default_enter_margin() -> f32 {
    100.0
}
fn default_exit_margin() -> f32 {
    -100.0
}
fn default_enter_threshold() -> f32 {
    0.1
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            enter_margin_px: default_enter_margin(),
            exit_margin_px: default_exit_margin(),
            enter_threshold: default_enter_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GallerySettings {
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,
    #[serde(default = "default_min_search_chars")]
    pub min_search_chars: usize,
    #[serde(default = "default_dataset")]
    pub default_dataset: String,
    #[serde(default = "default_index_path")]
    pub index_path: String,
}

fn default_items_per_page() -> usize {
    5
}
fn default_min_search_chars() -> usize {
    2
}
fn default_dataset() -> String {
    "proper".into()
}
fn default_index_path() -> String {
    "data/gallery.json".into()
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            items_per_page: default_items_per_page(),
            min_search_chars: default_min_search_chars(),
            default_dataset: default_dataset(),
            index_path: default_index_path(),
        }
    }
}

/// Tuning for wheel momentum and transition pacing.
///
/// The momentum constants are empirical; they are kept configurable rather
/// than treated as invariants.
#[derive(Debug, Clone, Deserialize)]
pub struct NavigationSettings {
    #[serde(default = "default_momentum_threshold")]
    pub momentum_threshold: f32,
    #[serde(default = "default_momentum_max")]
    pub momentum_max: f32,
    #[serde(default = "default_accumulation_factor")]
    pub accumulation_factor: f32,
    #[serde(default = "default_decay_step")]
    pub decay_step: f32,
    #[serde(default = "default_decay_interval_ms")]
    pub decay_interval_ms: u64,
    #[serde(default = "default_decay_delay_ms")]
    pub decay_delay_ms: u64,
    #[serde(default = "default_transition_settle_ms")]
    pub transition_settle_ms: u64,
}

fn default_momentum_threshold() -> f32 {
    25.0
}
fn default_momentum_max() -> f32 {
    100.0
}
fn default_accumulation_factor() -> f32 {
    0.25
}
fn default_decay_step() -> f32 {
    2.0
}
fn default_decay_interval_ms() -> u64 {
    60
}
fn default_decay_delay_ms() -> u64 {
    200
}
fn default_transition_settle_ms() -> u64 {
    1000
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            momentum_threshold: default_momentum_threshold(),
            momentum_max: default_momentum_max(),
            accumulation_factor: default_accumulation_factor(),
            decay_step: default_decay_step(),
            decay_interval_ms: default_decay_interval_ms(),
            decay_delay_ms: default_decay_delay_ms(),
            transition_settle_ms: default_transition_settle_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_path() -> String {
    "data/local-storage.json".into()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback chain: explicit path → ./config/default.toml → hardcoded defaults.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Self {
        if let Some(path) = explicit_path {
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {e}", path.display());
                }
            }
        }

        let default_path = Path::new("config/default.toml");
        if default_path.exists() {
            match Self::load(default_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!("Failed to load default config: {e}");
                }
            }
        }

        tracing::info!("Using hardcoded default configuration");
        Self::default()
    }
}
