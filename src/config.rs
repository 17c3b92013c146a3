//! Runtime configuration.
//!
//! Values are resolved in three layers: built-in defaults, an optional YAML
//! file, then command-line flags and environment variables.
//!
//! ```yaml
//! base_url: https://www.muscleandstrength.com
//! output_dir: scraped-articles
//! images_dir: public/images/articles
//! min_articles: 100
//! listing_delay_ms: 2000
//! ```

use crate::cli::Cli;
use crate::error::{Result, ScrapeError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Site root; every listing page and relative link is resolved against it.
    pub base_url: String,
    /// Where article JSON files and `summary.json` go.
    pub output_dir: PathBuf,
    /// Filesystem root for downloaded images.
    pub images_dir: PathBuf,
    /// Path prefix written into records in place of remote image URLs.
    pub public_image_prefix: String,
    pub mongodb_uri: Option<String>,
    pub request_timeout_secs: u64,
    /// Gap between listing-page fetches during discovery.
    pub listing_delay_ms: u64,
    /// Gap between article fetches.
    pub article_delay_ms: u64,
    /// Gap between inline image downloads.
    pub image_delay_ms: u64,
    /// Listing pages are crawled for `?page=2` through `?page=<last_listing_page>`.
    pub last_listing_page: u32,
    /// Fallback list is appended when discovery finds fewer URLs than this.
    pub min_articles: usize,
    /// A link slug must be longer than this to count as an article.
    pub min_slug_len: usize,
    /// Stripped from the end of page titles.
    pub site_name_suffix: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.muscleandstrength.com".to_string(),
            output_dir: PathBuf::from("scraped-articles"),
            images_dir: PathBuf::from("public/images/articles"),
            public_image_prefix: "/images/articles".to_string(),
            mongodb_uri: None,
            request_timeout_secs: 30,
            listing_delay_ms: 2000,
            article_delay_ms: 2000,
            image_delay_ms: 500,
            last_listing_page: 5,
            min_articles: 100,
            min_slug_len: 8,
            site_name_suffix: " | Muscle & Strength".to_string(),
        }
    }
}

impl ScraperConfig {
    /// Load defaults, overlaid with the YAML file at `path` when given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = fs::read_to_string(path).await?;
                let config: ScraperConfig = serde_yaml::from_str(&raw)?;
                info!(path, "Loaded configuration file");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line and environment overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(dir) = &cli.images_dir {
            self.images_dir = dir.clone();
        }
        if let Some(base) = &cli.base_url {
            self.base_url = base.clone();
        }
        if let Some(uri) = &cli.mongodb_uri {
            self.mongodb_uri = Some(uri.clone());
        }
        if let Some(n) = cli.min_articles {
            self.min_articles = n;
        }
        if let Some(n) = cli.min_slug_len {
            self.min_slug_len = n;
        }
        if cli.no_delay {
            self.disable_delays();
        }
    }

    pub fn disable_delays(&mut self) {
        self.listing_delay_ms = 0;
        self.article_delay_ms = 0;
        self.image_delay_ms = 0;
    }

    /// The parsed site root.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| ScrapeError::Config(format!("base_url {:?}: {e}", self.base_url)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn listing_delay(&self) -> Duration {
        Duration::from_millis(self.listing_delay_ms)
    }

    pub fn article_delay(&self) -> Duration {
        Duration::from_millis(self.article_delay_ms)
    }

    pub fn image_delay(&self) -> Duration {
        Duration::from_millis(self.image_delay_ms)
    }
}
