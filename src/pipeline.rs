//! Run orchestration.
//!
//! One strictly sequential pass:
//!
//! ```text
//! index -> discover -> for each URL: fetch -> extract -> images -> write JSON
//!       -> write summary
//! ```
//!
//! A failure for one article is logged and the loop moves on; nothing past
//! the per-URL boundary aborts the run.

use crate::config::ScraperConfig;
use crate::error::Result;
use crate::http::Fetcher;
use crate::images::ImageMaterializer;
use crate::index::build_index;
use crate::models::{RunSummary, SummaryEntry};
use crate::outputs::json;
use crate::scrapers::discover::{DiscoveryConfig, Discoverer};
use crate::scrapers::extract::Extractor;
use crate::store::RecordStore;
use crate::throttle::Throttle;
use crate::utils::{ensure_writable_dir, timestamp};
use tracing::{error, info, instrument, warn};

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub discovered: usize,
    pub scraped: usize,
    pub fetch_failed: usize,
    pub extract_failed: usize,
    pub write_failed: usize,
    pub images_downloaded: usize,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub stats: RunStats,
}

/// Run the full scrape with `config`, deduplicating against `store` when given.
///
/// Only start-up problems are returned as errors: an invalid base URL or an
/// output directory that cannot be written.
#[instrument(level = "info", skip_all)]
pub async fn run<S: RecordStore>(config: &ScraperConfig, store: Option<&S>) -> Result<RunReport> {
    let base_url = config.base_url()?;
    ensure_writable_dir(&config.output_dir).await?;
    ensure_writable_dir(&config.images_dir).await?;

    let fetcher = Fetcher::new(config.request_timeout())?;
    let index = build_index(&config.output_dir, store).await;

    let urls = Discoverer::new(
        &fetcher,
        &index,
        DiscoveryConfig::from_config(config)?,
        Throttle::new(config.listing_delay()),
    )
    .discover()
    .await;

    let extractor = Extractor::new(base_url.clone(), config.site_name_suffix.clone());
    let mut materializer = ImageMaterializer::new(
        &fetcher,
        base_url,
        &config.images_dir,
        config.public_image_prefix.clone(),
        Throttle::new(config.image_delay()),
    );
    let mut article_throttle = Throttle::new(config.article_delay());

    let mut stats = RunStats {
        discovered: urls.len(),
        ..RunStats::default()
    };
    let mut entries = Vec::new();

    for (i, url) in urls.iter().enumerate() {
        article_throttle.wait().await;
        info!(index = i + 1, total = urls.len(), %url, "Processing article");

        let html = match fetcher.fetch_text(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(%url, error = %e, "Article fetch failed; skipping");
                stats.fetch_failed += 1;
                continue;
            }
        };

        let mut article = match extractor.extract(url, &html) {
            Ok(article) => article,
            Err(e) => {
                warn!(%url, error = %e, "Extraction failed; skipping");
                stats.extract_failed += 1;
                continue;
            }
        };

        let rewrites = materializer.materialize(&mut article).await;
        stats.images_downloaded += rewrites.len();

        article.scraped_at = timestamp();
        match json::write_article(&config.output_dir, &article).await {
            Ok(path) => {
                info!(title = %article.title, path = %path.display(), "Article saved");
                entries.push(SummaryEntry::from(&article));
                stats.scraped += 1;
            }
            Err(e) => {
                error!(%url, error = %e, "Failed to write article JSON");
                stats.write_failed += 1;
            }
        }
    }

    let summary = RunSummary::new(entries, timestamp());
    if let Err(e) = json::write_summary(&config.output_dir, &summary).await {
        error!(error = %e, "Failed to write run summary");
    }

    info!(
        discovered = stats.discovered,
        scraped = stats.scraped,
        fetch_failed = stats.fetch_failed,
        extract_failed = stats.extract_failed,
        write_failed = stats.write_failed,
        images = stats.images_downloaded,
        output_dir = %config.output_dir.display(),
        images_dir = %config.images_dir.display(),
        "Scraping complete"
    );

    Ok(RunReport { summary, stats })
}
