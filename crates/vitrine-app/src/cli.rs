use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vitrine", about = "Vitrine: browse, search and preview the effects gallery")]
pub struct Cli {
    /// Path to config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Content index to load instead of `gallery.index_path`
    #[arg(long)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List datasets in the content index
    Datasets,

    /// List the sections of a dataset with their cards
    Sections {
        #[arg(long)]
        dataset: Option<String>,
    },

    /// Filter, search and page through a dataset's gallery view
    Search {
        #[arg(long)]
        dataset: Option<String>,
        /// Tag filter (case-insensitive)
        #[arg(long)]
        tag: Option<String>,
        /// Free-text query over title, description and tags
        #[arg(long)]
        query: Option<String>,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Shuffle instead of sorting by title
        #[arg(long)]
        shuffle: bool,
        /// Seed for a reproducible shuffle (implies --shuffle)
        #[arg(long)]
        seed: Option<u32>,
        /// Start from the tag and search saved by the previous run
        #[arg(long)]
        resume: bool,
        /// Print the view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the shareable link for a section and optional card
    Link {
        #[arg(long)]
        dataset: Option<String>,
        /// Section slug or 1-based number
        #[arg(long)]
        section: String,
        /// 1-based card slot to spotlight
        #[arg(long)]
        card: Option<usize>,
        /// Absolute page URL to build the link against
        #[arg(long)]
        base: Option<String>,
    },

    /// Resolve a shared link to the state it opens
    Open {
        /// Absolute URL or relative reference such as `?gallery=proper&section=2`
        url: String,
    },

    /// Toggle the favorite on a card
    Favorite {
        #[arg(long)]
        dataset: Option<String>,
        /// Section slug or 1-based number
        #[arg(long)]
        section: String,
        /// 1-based card slot
        #[arg(long)]
        card: usize,
    },

    /// List favorited entries of a dataset
    Favorites {
        #[arg(long)]
        dataset: Option<String>,
    },

    /// Replay keyboard shortcuts against the section navigator
    Keys {
        #[arg(long)]
        dataset: Option<String>,
        /// Key names as reported by the browser, e.g. `j ArrowDown 2 f Escape`
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Scroll a simulated viewport through every card and trace the preview pool
    Simulate {
        #[arg(long)]
        dataset: Option<String>,
        /// Override `pool.max_contexts`
        #[arg(long)]
        max: Option<usize>,
        /// Pixels scrolled per step
        #[arg(long, default_value_t = 200.0)]
        step_px: f32,
        /// Wall-clock time between steps
        #[arg(long, default_value_t = 50)]
        step_ms: u64,
        /// Simulated time a preview takes to load
        #[arg(long, default_value_t = 120)]
        latency_ms: u64,
    },

    /// Show or change display preferences
    Display {
        #[arg(long)]
        reduced_motion: Option<bool>,
        #[arg(long)]
        high_contrast: Option<bool>,
        #[arg(long)]
        telemetry: Option<bool>,
    },
}
