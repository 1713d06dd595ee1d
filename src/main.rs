//! # Keyword News Collector
//!
//! Collects news articles matching a keyword from Google News, Yahoo! News
//! Japan and Bing/MSN News, normalizes publication times to JST, and appends
//! only articles not already stored to one partition per source.
//!
//! ## Usage
//!
//! ```sh
//! keyword_news_collector -k ホンダ -s ./news_store
//! ```
//!
//! ## Architecture
//!
//! For each source, in order:
//! 1. **Rendering**: Fetch the search results page for the keyword
//! 2. **Extraction**: Pull candidate records through selector fallback chains
//! 3. **Freshness**: Normalize time labels; probe `Last-Modified` when none is usable
//! 4. **Sanitizing**: Validate titles and URLs, fill source fallbacks
//! 5. **Dedup**: Drop in-batch duplicates and URLs already in the store
//! 6. **Append**: Write new rows with bounded retry on contention
//!
//! A failing source never stops the others. The process exits with an error
//! only when every source failed.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dedup;
mod freshness;
mod models;
mod outputs;
mod pipeline;
mod render;
mod sanitize;
mod scrapers;
mod store;
mod temporal;
mod utils;
mod writer;

use cli::Cli;
use config::load_config;
use freshness::HeadProbe;
use models::reference_now;
use outputs::json;
use pipeline::Pipeline;
use render::HttpRenderer;
use store::file::JsonLinesStore;
use store::memory::MemoryStore;
use utils::ensure_writable_dir;

/// Early check: the store directory must be writable before any scraping.
/// A dry run never writes, so it neither creates nor probes the directory.
async fn check_store_dir(store: &str, dry_run: bool) -> Result<(), Box<dyn Error>> {
    if dry_run {
        debug!(path = %store, "Dry run: skipping store writability check");
        return Ok(());
    }
    if let Err(e) = ensure_writable_dir(store).await {
        error!(
            path = %store,
            error = %e,
            "Store directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    Ok(())
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("keyword_news_collector starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = load_config(args.config.as_deref()).await?;
    if !args.sources.is_empty() {
        config.sources = args.sources.clone();
    }
    if args.no_freshness {
        config.freshness.enabled = false;
    }
    if config.sources.is_empty() {
        warn!("No sources configured; nothing to do");
        return Ok(());
    }

    check_store_dir(&args.store, args.dry_run).await?;

    let renderer = HttpRenderer::new(&config.render)?;
    let probe = HeadProbe::new(&config.freshness, &config.render.user_agent)?;
    let store = JsonLinesStore::new(&args.store);

    // One reference time for the whole run.
    let reference = reference_now();
    info!(keyword = %args.keyword, store = %args.store, %reference, "Collecting");

    let report = if args.dry_run {
        let partitions: Vec<&str> = config.sources.iter().map(|k| k.partition()).collect();
        let snapshot = MemoryStore::snapshot_of(&store, &partitions).await?;
        info!("Dry run: the store will not be modified");
        Pipeline::new(renderer, snapshot, probe, config)
            .run(&args.keyword, reference)
            .await
    } else {
        Pipeline::new(renderer, store, probe, config)
            .run(&args.keyword, reference)
            .await
    };

    for source in &report.sources {
        match &source.error {
            None => info!(
                source = %source.source,
                partition = %source.partition,
                extracted = source.extracted,
                new = source.new,
                appended = source.appended,
                "Source summary"
            ),
            Some(e) => warn!(
                source = %source.source,
                partition = %source.partition,
                error = %e,
                "Source summary (failed)"
            ),
        }
    }

    if let Some(path) = args.report.as_deref() {
        if let Err(e) = json::write_report(&report, path).await {
            error!(error = %e, path, "Failed to write run report");
        }
    }

    let appended: usize = report.sources.iter().map(|s| s.appended).sum();
    info!(
        appended,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Run complete"
    );

    if report.all_failed() {
        return Err("every source failed".into());
    }
    Ok(())
}
