//! Pending-import report for the `check` command.
//!
//! Compares the article files on disk with the record store and counts what
//! an import would still have to pick up, including the images those new
//! articles reference and the image files already downloaded.

use crate::config::ScraperConfig;
use crate::index::{article_files, normalize_slug, read_local_articles};
use crate::store::RecordStore;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentReport {
    /// Article files in the output directory, parseable or not.
    pub local_articles: usize,
    /// Records in the store; `None` when the store was not configured or failed.
    pub store_records: Option<usize>,
    /// Local article files that are not new.
    pub already_imported: usize,
    /// Local articles with a slug the store does not have.
    pub new_articles: usize,
    /// Hero plus inline images referenced by the new articles.
    pub new_article_images: usize,
    /// Image files under the images directory.
    pub local_images: usize,
}

/// Count image files under `dir`, recursively.
pub async fn count_image_files(dir: &Path) -> usize {
    let mut count = 0;
    let mut pending: Vec<PathBuf> = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = match fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %current.display(), error = %e, "Skipping unreadable directory");
                continue;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            match entry.file_type().await {
                Ok(kind) if kind.is_dir() => pending.push(path),
                Ok(kind) if kind.is_file() => {
                    let is_image = path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
                    if is_image {
                        count += 1;
                    }
                }
                _ => {}
            }
        }
    }
    count
}

/// Build the pending-import report.
#[instrument(level = "info", skip_all, fields(output_dir = %config.output_dir.display()))]
pub async fn check_new_content<S: RecordStore>(
    config: &ScraperConfig,
    store: Option<&S>,
) -> ContentReport {
    let known_slugs: Option<HashSet<String>> = match store {
        Some(store) => match store.known_records().await {
            Ok(records) => Some(
                records
                    .into_iter()
                    .filter_map(|r| r.slug)
                    .map(|s| normalize_slug(&s))
                    .collect(),
            ),
            Err(e) => {
                warn!(error = %e, "Could not read record store; treating every local article as new");
                None
            }
        },
        None => None,
    };

    let local_files = article_files(&config.output_dir).await.len();
    let articles = read_local_articles(&config.output_dir).await;
    let mut report = ContentReport {
        local_articles: local_files,
        store_records: known_slugs.as_ref().map(HashSet::len),
        ..ContentReport::default()
    };

    // Files without a slug, or that fail to parse, cannot be imported and
    // count as already handled.
    for article in &articles {
        let slug = normalize_slug(&article.slug);
        let is_new = !slug.is_empty()
            && known_slugs
                .as_ref()
                .is_none_or(|known| !known.contains(&slug));
        if is_new {
            report.new_articles += 1;
            report.new_article_images +=
                usize::from(!article.hero_image.is_empty()) + article.images.len();
        }
    }
    report.already_imported = report.local_articles - report.new_articles;

    report.local_images = count_image_files(&config.images_dir).await;

    info!(
        local_articles = report.local_articles,
        store_records = ?report.store_records,
        already_imported = report.already_imported,
        new_articles = report.new_articles,
        new_article_images = report.new_article_images,
        local_images = report.local_images,
        "Content check complete"
    );
    report
}
