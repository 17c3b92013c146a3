//! # Fitness Scraper
//!
//! Collects fitness articles from a public content site and stores each one
//! as a normalized JSON document with locally downloaded images, ready for
//! import into the site's own database.
//!
//! ## Features
//!
//! - Discovers article URLs from the homepage, the article index and every
//!   known category listing, paging through the first few pages of each
//! - Skips anything already scraped locally or already imported into MongoDB
//! - Extracts title, category, content, excerpt and hero image through
//!   ordered selector fallback chains
//! - Downloads hero and inline images and rewrites the article to use them
//! - Writes one JSON file per article plus a run `summary.json`
//! - `check` reports which scraped articles still need importing
//!
//! ## Usage
//!
//! ```sh
//! fitness_scraper -o ./scraped-articles -i ./public/images/articles
//! fitness_scraper --mongodb-uri mongodb://localhost/site check
//! ```
//!
//! ## Architecture
//!
//! 1. **Indexing**: collect known slugs and URLs from disk and the store
//! 2. **Discovery**: crawl listing pages for new article URLs
//! 3. **Extraction**: fetch each article and pull out its fields
//! 4. **Images**: download images and rewrite references to local paths
//! 5. **Output**: write article JSON files and the run summary

use clap::Parser;
use std::error::Error;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod http;
mod images;
mod index;
mod models;
mod outputs;
mod pipeline;
mod report;
mod scrapers;
mod store;
mod throttle;
mod utils;

use cli::{Cli, Command};
use config::ScraperConfig;
use store::MongoStore;

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
    info!("fitness_scraper starting up");

    let args = Cli::parse();
    debug!(?args.output_dir, ?args.images_dir, ?args.config, "Parsed CLI arguments");

    let mut config = ScraperConfig::load(args.config.as_deref()).await?;
    config.apply_cli(&args);
    debug!(
        base_url = %config.base_url,
        output_dir = %config.output_dir.display(),
        images_dir = %config.images_dir.display(),
        "Resolved configuration"
    );

    let store = config.mongodb_uri.as_deref().map(MongoStore::new);
    match &store {
        Some(store) => info!(host = ?store.host(), "Record store configured"),
        None => info!("No record store configured; deduplicating against local files only"),
    }

    match args.command() {
        Command::Scrape => {
            let report = pipeline::run(&config, store.as_ref()).await?;
            info!(
                scraped = report.stats.scraped,
                discovered = report.stats.discovered,
                summary_articles = report.summary.total_articles,
                summary_at = %report.summary.scraped_at,
                "Scrape finished"
            );
        }
        Command::Check => {
            let report = report::check_new_content(&config, store.as_ref()).await;
            info!(
                new_articles = report.new_articles,
                already_imported = report.already_imported,
                "Check finished"
            );
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        "Execution complete"
    );

    Ok(())
}
