mod cli;
mod commands;
mod preview;
mod session;
mod setup;

use anyhow::Result;
use clap::Parser;
use vitrine_core::config::AppConfig;
use vitrine_core::lifecycle;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    lifecycle::init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref());
    let data = cli.data.as_deref();
    lifecycle::log_startup(&config.gallery.default_dataset);

    let result = match cli.command {
        Commands::Datasets => commands::datasets(&config, data),
        Commands::Sections { dataset } => commands::sections(&config, data, dataset),
        Commands::Search {
            dataset,
            tag,
            query,
            page,
            shuffle,
            seed,
            resume,
            json,
        } => commands::search(
            &config, data, dataset, tag, query, page, shuffle, seed, resume, json,
        ),
        Commands::Link {
            dataset,
            section,
            card,
            base,
        } => commands::link(&config, data, dataset, section, card, base),
        Commands::Open { url } => commands::open(&config, data, url),
        Commands::Favorite {
            dataset,
            section,
            card,
        } => commands::favorite(&config, data, dataset, section, card),
        Commands::Favorites { dataset } => commands::favorites(&config, data, dataset),
        Commands::Keys { dataset, keys } => commands::keys(&config, data, dataset, keys),
        Commands::Simulate {
            dataset,
            max,
            step_px,
            step_ms,
            latency_ms,
        } => {
            commands::simulate(&config, data, dataset, max, step_px, step_ms, latency_ms).await
        }
        Commands::Display {
            reduced_motion,
            high_contrast,
            telemetry,
        } => commands::display(&config, reduced_motion, high_contrast, telemetry),
    };

    lifecycle::log_shutdown();
    result
}
