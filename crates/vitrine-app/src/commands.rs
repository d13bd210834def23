use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use url::Url;
use vitrine_core::config::AppConfig;
use vitrine_core::content::SECTION_SLOTS;
use vitrine_core::{CardHandle, Dataset};
use vitrine_gallery::SortOrder;
use vitrine_nav::{command_for_key, DeepLink, KeyInput, NavCommand, NavConfig, NavEffect, NavigationController};
use vitrine_pool::{ContextPool, LazyLoader, LoaderConfig, PoolConfig, Rect};
use vitrine_store::PreferenceStore;

use crate::preview::{self, SimulatedSurface, CARD_WIDTH};
use crate::session::{GallerySession, Step};
use crate::setup::{load_index, open_store, resolve_dataset};

const VIEWPORT_HEIGHT: f32 = 800.0;

pub fn datasets(config: &AppConfig, data: Option<&Path>) -> Result<()> {
    let index = load_index(config, data)?;
    let mut count = 0;
    for dataset in index.datasets() {
        println!(
            "{}\t{}\t{} sections\t{} entries",
            dataset.key,
            dataset.title,
            dataset.section_count(),
            dataset.entry_count()
        );
        count += 1;
    }
    println!("({count} datasets)");
    for issue in index.issues() {
        eprintln!("warning: {issue}");
    }
    Ok(())
}

pub fn sections(config: &AppConfig, data: Option<&Path>, dataset: Option<String>) -> Result<()> {
    let index = load_index(config, data)?;
    let dataset = resolve_dataset(config, &index, dataset.as_deref())?;
    println!("{}: {}", dataset.title, dataset.subtitle);
    for (i, section) in dataset.sections.iter().enumerate() {
        println!(
            "{:>2}. {} [{}] #{}",
            i + 1,
            section.theme.name,
            section.theme.geometry,
            section.theme.slug()
        );
        for slot in 0..section.filled_slots() {
            let Some(entry) = section.slot(slot) else {
                continue;
            };
            let heavy = if entry.is_heavy {
                format!("  {}", dataset.heavy_preview.label)
            } else {
                String::new()
            };
            println!("    {}. {}{heavy}", slot + 1, entry.title);
        }
        let extra = section.entries.len().saturating_sub(SECTION_SLOTS);
        if extra > 0 {
            println!("    +{extra} more in the gallery view");
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn search(
    config: &AppConfig,
    data: Option<&Path>,
    dataset: Option<String>,
    tag: Option<String>,
    query: Option<String>,
    page: usize,
    shuffle: bool,
    seed: Option<u32>,
    resume: bool,
    json: bool,
) -> Result<()> {
    let index = load_index(config, data)?;
    let dataset = resolve_dataset(config, &index, dataset.as_deref())?;
    let mut session = GallerySession::open(config, dataset, open_store(config));
    if resume {
        session.resume_view();
    }

    let gallery = session.gallery_mut();
    if let Some(tag) = tag {
        gallery.clear_tag_filter();
        gallery.toggle_tag(&tag);
    }
    if let Some(query) = query {
        gallery.set_search(&query);
    }
    match (seed, shuffle) {
        (Some(seed), _) => gallery.set_order(SortOrder::Shuffled(seed)),
        (None, true) => {
            gallery.reshuffle();
        }
        (None, false) => {}
    }
    gallery.go_to_page(page.saturating_sub(1));

    let view = gallery.view();
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        for (offset, item) in view.visible().iter().enumerate() {
            let star = if item.favorite { " ★" } else { "" };
            println!(
                "{:>3}. {} [{}] {}{star}",
                view.range.start + offset + 1,
                item.entry.title,
                item.entry.tags.join(", "),
                item.entry.url
            );
        }
        if gallery.pagination().controls_visible() {
            println!("{}", gallery.pagination().indicator());
        }
        println!("({} of {} entries)", view.total(), gallery.dataset().entry_count());
    }

    if !session.save() {
        tracing::warn!("Search state was not saved");
    }
    Ok(())
}

/// Link aimed at `section` (slug or 1-based number) and optional 1-based `card`.
fn section_link(dataset: &Dataset, section: &str, card: Option<usize>) -> Result<DeepLink> {
    let link = DeepLink {
        dataset: Some(dataset.key.clone()),
        section: Some(section.to_string()),
        card: card.and_then(|c| c.checked_sub(1)),
        hash: None,
    };
    if link.section_index(dataset).is_none() {
        bail!("No section {section:?} in {}", dataset.key);
    }
    Ok(link)
}

pub fn link(
    config: &AppConfig,
    data: Option<&Path>,
    dataset: Option<String>,
    section: String,
    card: Option<usize>,
    base: Option<String>,
) -> Result<()> {
    let index = load_index(config, data)?;
    let dataset = resolve_dataset(config, &index, dataset.as_deref())?;
    let target = section_link(&dataset, &section, card)?;

    let mut nav = NavigationController::new(Arc::clone(&dataset), NavConfig::from(&config.navigation));
    if let Some(base) = base {
        let base = Url::parse(&base).with_context(|| format!("invalid base URL {base:?}"))?;
        nav.set_base(base);
    }
    nav.apply_link(&target);
    if let Some(card) = card.filter(|_| nav.spotlight().is_none()) {
        eprintln!("warning: section {section} has no card {card}");
    }
    println!("{}", nav.link());
    Ok(())
}

pub fn open(config: &AppConfig, data: Option<&Path>, url: String) -> Result<()> {
    let index = load_index(config, data)?;
    let link = DeepLink::parse(&url);
    let dataset = index
        .resolve(
            link.dataset.as_deref(),
            link.hash.as_deref(),
            &config.gallery.default_dataset,
        )
        .context("content index has no datasets")?;
    let mut session = GallerySession::open(config, dataset, open_store(config));
    session.open_link(&link);

    let dataset = Arc::clone(session.dataset());
    let nav = session.nav();
    let current = nav.current_section();
    let name = dataset
        .section(current)
        .map(|s| s.theme.name.as_str())
        .unwrap_or_default();
    println!("dataset: {} ({})", dataset.key, dataset.title);
    println!("section: {}/{} {name}", current + 1, nav.section_count());
    match session.spotlighted() {
        Some((location, entry)) => {
            println!("spotlight: {} {} ({})", location.slot + 1, entry.title, entry.url)
        }
        None => println!("spotlight: none"),
    }
    println!("canonical: {}", session.nav().link());

    session.save();
    Ok(())
}

pub fn favorite(
    config: &AppConfig,
    data: Option<&Path>,
    dataset: Option<String>,
    section: String,
    card: usize,
) -> Result<()> {
    let index = load_index(config, data)?;
    let dataset = resolve_dataset(config, &index, dataset.as_deref())?;
    let target = section_link(&dataset, &section, Some(card))?;
    let mut session = GallerySession::open(config, dataset, open_store(config));
    session.open_link(&target);
    if session.nav().spotlight().is_none() {
        bail!("Section {section} has no card {card}");
    }

    let step = session.handle(NavCommand::ToggleFavorite, Instant::now());
    let Some((location, on)) = step.favorite else {
        bail!("Card {card} of section {section} could not be favorited");
    };
    let title = session
        .dataset()
        .entry_at(location)
        .map(|e| e.title.clone())
        .unwrap_or_default();
    println!("{} {title}", if on { "favorited" } else { "unfavorited" });
    session.save();
    Ok(())
}

pub fn favorites(config: &AppConfig, data: Option<&Path>, dataset: Option<String>) -> Result<()> {
    let index = load_index(config, data)?;
    let dataset = resolve_dataset(config, &index, dataset.as_deref())?;
    let session = GallerySession::open(config, Arc::clone(&dataset), open_store(config));
    let urls = session.gallery().favorites().urls();
    for url in urls {
        let title = dataset
            .locations_of_url(url)
            .first()
            .and_then(|location| dataset.entry_at(*location))
            .map_or("(no longer in dataset)", |e| e.title.as_str());
        println!("{title}\t{url}");
    }
    println!("({} favorites)", urls.len());
    Ok(())
}

/// Turn a replay token into a command. Besides key names this accepts
/// `wheel:<dy>`, `scroll:<fraction>`, `link:<url>` and `ctrl+<key>` chords.
fn parse_token(token: &str) -> Option<NavCommand> {
    if let Some(delta) = token.strip_prefix("wheel:") {
        return delta.parse().ok().map(NavCommand::Wheel);
    }
    if let Some(fraction) = token.strip_prefix("scroll:") {
        return fraction.parse().ok().map(NavCommand::ScrollPosition);
    }
    if let Some(link) = token.strip_prefix("link:") {
        return Some(NavCommand::OpenLink(link.to_string()));
    }
    let input = match token.strip_prefix("ctrl+") {
        Some(key) => KeyInput {
            ctrl: true,
            ..KeyInput::key(key)
        },
        None => KeyInput::key(token),
    };
    command_for_key(&input)
}

fn describe(session: &GallerySession, step: &Step) -> String {
    let dataset = session.dataset();
    let section_name =
        |index: usize| dataset.section(index).map_or("", |s| s.theme.name.as_str());
    match &step.effect {
        NavEffect::Transitioned(t) => {
            format!("section {} -> {} ({})", t.from + 1, t.to + 1, section_name(t.to))
        }
        NavEffect::SpotlightChanged(Some(slot)) => {
            let title = session.spotlighted().map_or("", |(_, e)| e.title.as_str());
            format!("spotlight card {} ({title})", slot + 1)
        }
        NavEffect::SpotlightChanged(None) => "spotlight cleared".to_string(),
        NavEffect::DeckChanged(true) => "deck open".to_string(),
        NavEffect::DeckChanged(false) => "deck closed".to_string(),
        NavEffect::ToggleFavorite(location) => {
            let title = dataset.entry_at(*location).map_or("", |e| e.title.as_str());
            match step.favorite {
                Some((_, true)) => format!("favorited {title}"),
                Some((_, false)) => format!("unfavorited {title}"),
                None => format!("could not favorite {title}"),
            }
        }
        NavEffect::FocusSearch => "focus search".to_string(),
        NavEffect::LinkApplied => {
            let current = session.nav().current_section();
            format!("link applied: section {} ({})", current + 1, section_name(current))
        }
        NavEffect::Unchanged => "unchanged".to_string(),
    }
}

/// Replay `keys` one after another. Each accepted transition is given its
/// full settle time before the next token; other tokens arrive a frame apart.
pub fn keys(
    config: &AppConfig,
    data: Option<&Path>,
    dataset: Option<String>,
    keys: Vec<String>,
) -> Result<()> {
    let index = load_index(config, data)?;
    let dataset = resolve_dataset(config, &index, dataset.as_deref())?;
    let mut session = GallerySession::open(config, dataset, open_store(config));
    let settle = Duration::from_millis(config.navigation.transition_settle_ms + 1);
    let frame = Duration::from_millis(16);

    let mut now = Instant::now();
    for token in &keys {
        let Some(cmd) = parse_token(token) else {
            println!("{token}: ignored");
            now += frame;
            continue;
        };
        let step = session.handle(cmd, now);
        println!("{token}: {}", describe(&session, &step));
        now += match step.effect {
            NavEffect::Transitioned(_) => settle,
            _ => frame,
        };
    }
    println!("history: {} entries", session.history().len());
    println!("link: {}", session.nav().link());
    session.save();
    Ok(())
}

pub fn display(
    config: &AppConfig,
    reduced_motion: Option<bool>,
    high_contrast: Option<bool>,
    telemetry: Option<bool>,
) -> Result<()> {
    let prefs = PreferenceStore::new(open_store(config));
    let mut display = prefs.load_display();
    let before = display.clone();
    if let Some(value) = reduced_motion {
        display.reduced_motion = value;
    }
    if let Some(value) = high_contrast {
        display.high_contrast = value;
    }
    if let Some(value) = telemetry {
        display.telemetry = value;
    }
    if display != before && !prefs.save_display(&display) {
        bail!("Display preferences could not be saved");
    }
    println!("reduced_motion = {}", display.reduced_motion);
    println!("high_contrast = {}", display.high_contrast);
    println!("telemetry = {}", display.telemetry);
    Ok(())
}

pub async fn simulate(
    config: &AppConfig,
    data: Option<&Path>,
    dataset: Option<String>,
    max: Option<usize>,
    step_px: f32,
    step_ms: u64,
    latency_ms: u64,
) -> Result<()> {
    if step_px <= 0.0 {
        bail!("--step-px must be positive");
    }
    let index = load_index(config, data)?;
    let dataset = resolve_dataset(config, &index, dataset.as_deref())?;

    let mut pool_config = PoolConfig::from(&config.pool);
    if let Some(max) = max {
        pool_config.max_contexts = max.max(1);
    }
    let latency = Duration::from_millis(latency_ms);
    let surface = Arc::new(SimulatedSurface::new(&dataset, latency));
    let pool = ContextPool::new(pool_config.clone(), surface.clone());
    let mut loader = LazyLoader::new(LoaderConfig::from(&config.loader), pool.clone());

    let cards = preview::layout(&dataset);
    let bounds: HashMap<CardHandle, Rect> = cards.iter().map(|c| (c.handle, c.bounds)).collect();
    for card in &cards {
        if card.poolable {
            loader.annotate(card.handle, card.src.clone());
            loader.observe_card(card.handle);
        } else if let Some(entry) = dataset.entry_at(card.location) {
            println!(
                "{} {}: {} ({})",
                card.handle, entry.title, dataset.heavy_preview.label, dataset.heavy_preview.button
            );
        }
    }
    println!(
        "simulating {} cards ({} pooled) with {} contexts",
        cards.len(),
        loader.observed_count(),
        pool_config.max_contexts
    );

    let started = Instant::now();
    let peak = Arc::new(AtomicUsize::new(0));
    let mut status_rx = pool.subscribe();
    let monitor = {
        let peak = Arc::clone(&peak);
        tokio::spawn(async move {
            while status_rx.changed().await.is_ok() {
                let status = *status_rx.borrow_and_update();
                peak.fetch_max(status.active, Ordering::Relaxed);
                println!("{:>6}ms  {status}", started.elapsed().as_millis());
            }
        })
    };

    let end = (preview::column_height(&cards) - VIEWPORT_HEIGHT).max(0.0);
    let mut y = 0.0_f32;
    loop {
        let viewport = Rect::new(0.0, y, CARD_WIDTH, VIEWPORT_HEIGHT);
        let report = loader.evaluate(viewport, |card| bounds.get(&card).copied());
        if !report.is_empty() {
            tracing::debug!(
                "y={y}: {} enqueued, {} released, {} withdrawn",
                report.enqueued.len(),
                report.released.len(),
                report.withdrawn.len()
            );
        }
        peak.fetch_max(pool.status().active, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(step_ms)).await;
        if y >= end {
            break;
        }
        y = (y + step_px).min(end);
    }

    // Let the tail of the queue settle at the bottom of the column.
    let queued = pool.status().queued as u32;
    let tail = (pool_config.settle_delay + latency) * (queued + 1);
    tokio::time::sleep(tail.min(pool_config.load_timeout)).await;
    let at_rest = pool.status();
    peak.fetch_max(at_rest.active, Ordering::Relaxed);

    loader.disconnect();
    pool.reset();
    monitor.abort();

    let stats = surface.stats();
    println!("at rest: {at_rest}");
    println!("peak {}/{} active", peak.load(Ordering::Relaxed), pool_config.max_contexts);
    println!(
        "{} previews loaded, {} destroyed, {} fallbacks, {} still live",
        stats.loaded,
        stats.destroyed,
        stats.fallbacks,
        surface.live_count()
    );
    Ok(())
}
