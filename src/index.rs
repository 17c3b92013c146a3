//! Existing-record index.
//!
//! Built once at start-up from the article files a previous run left in the
//! output directory, optionally extended with what the external record store
//! already holds. Discovery consults it so repeated runs only fetch new
//! articles.

use crate::store::RecordStore;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

pub const SUMMARY_FILE: &str = "summary.json";

/// Normalize a slug for membership tests: the `.html` marker some site
/// URLs carry is dropped.
pub fn normalize_slug(slug: &str) -> String {
    slug.replace(".html", "")
}

/// Slugs and source URLs that have already been processed.
#[derive(Debug, Clone, Default)]
pub struct ExistingIndex {
    slugs: HashSet<String>,
    urls: HashSet<String>,
}

impl ExistingIndex {
    /// Returns `true` if the slug was not present before.
    pub fn insert_slug(&mut self, slug: &str) -> bool {
        let slug = normalize_slug(slug);
        !slug.is_empty() && self.slugs.insert(slug)
    }

    /// Returns `true` if the URL was not present before.
    pub fn insert_url(&mut self, url: &str) -> bool {
        !url.is_empty() && self.urls.insert(url.to_string())
    }

    pub fn contains_slug(&self, slug: &str) -> bool {
        self.slugs.contains(&normalize_slug(slug))
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Already processed by either identity.
    pub fn contains(&self, slug: &str, url: &str) -> bool {
        self.contains_slug(slug) || self.contains_url(url)
    }

    pub fn slug_count(&self) -> usize {
        self.slugs.len()
    }

    pub fn url_count(&self) -> usize {
        self.urls.len()
    }
}

/// The fields of a persisted article file that later tooling reads back.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredArticle {
    pub slug: String,
    pub url: String,
    pub hero_image: String,
    pub images: Vec<String>,
}

/// Paths of every article JSON file in `output_dir` (not `summary.json`).
pub async fn article_files(output_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut entries = match fs::read_dir(output_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %output_dir.display(), error = %e, "No readable output directory");
            return files;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let is_summary = path.file_name().is_some_and(|name| name == SUMMARY_FILE);
        if is_json && !is_summary {
            files.push(path);
        }
    }
    files.sort();
    files
}

/// Read every parseable article file in `output_dir`. Unreadable or
/// malformed files are skipped.
pub async fn read_local_articles(output_dir: &Path) -> Vec<StoredArticle> {
    let mut articles = Vec::new();
    for path in article_files(output_dir).await {
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping unreadable file");
                continue;
            }
        };
        match serde_json::from_str::<StoredArticle>(&raw) {
            Ok(article) => articles.push(article),
            Err(e) => debug!(path = %path.display(), error = %e, "Skipping malformed file"),
        }
    }
    articles
}

/// Index built from the local output directory only.
pub async fn load_local(output_dir: &Path) -> ExistingIndex {
    let mut index = ExistingIndex::default();
    for article in read_local_articles(output_dir).await {
        index.insert_slug(&article.slug);
        index.insert_url(&article.url);
    }
    index
}

/// Build the existing-record index from local files and, when given, the
/// external store. Store failures are logged and ignored.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn build_index<S: RecordStore>(output_dir: &Path, store: Option<&S>) -> ExistingIndex {
    let mut index = load_local(output_dir).await;
    info!(
        slugs = index.slug_count(),
        urls = index.url_count(),
        "Indexed local articles"
    );

    if let Some(store) = store {
        match store.known_records().await {
            Ok(records) => {
                let mut new_slugs = 0usize;
                let mut new_urls = 0usize;
                for record in records {
                    if let Some(slug) = record.slug.as_deref() {
                        if index.insert_slug(slug) {
                            new_slugs += 1;
                        }
                    }
                    if let Some(url) = record.source_url.as_deref() {
                        if index.insert_url(url) {
                            new_urls += 1;
                        }
                    }
                }
                info!(new_slugs, new_urls, "Merged records from store");
            }
            Err(e) => warn!(error = %e, "Could not check record store; using local records only"),
        }
    }

    info!(
        slugs = index.slug_count(),
        urls = index.url_count(),
        "Existing-record index ready"
    );
    index
}
