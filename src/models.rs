//! Data models for scraped articles and run summaries.
//!
//! This module defines the records the scraper persists:
//! - [`ArticleRecord`]: one extracted article, written to its own JSON file
//! - [`Category`]: slug/label pair an article is filed under
//! - [`RunSummary`]: lightweight listing of everything produced in one run
//!
//! JSON field names are camelCase so the files can be imported by the site's
//! tooling unchanged.

use serde::{Deserialize, Serialize};

/// The topical grouping of an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Machine identifier, used in file and directory names.
    pub slug: String,
    /// Display label.
    pub name: String,
}

impl Category {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
        }
    }

    /// Catch-all category used when nothing else resolves.
    pub fn general() -> Self {
        Self::new("general", "General")
    }
}

/// A single extracted article.
///
/// Created by the extractor, mutated once by the image materializer
/// (`hero_image`, `images`, `content` get local paths), then handed to
/// persistence. `scraped_at` is stamped right before the file is written.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    /// The article title/headline.
    pub title: String,
    /// Final path segment of the source URL, filesystem-safe.
    pub slug: String,
    /// Category identifier.
    pub category_slug: String,
    /// Category display label.
    pub category_name: String,
    /// Serialized HTML of the main content block, boilerplate removed.
    pub content: String,
    /// Plain-text summary.
    pub excerpt: String,
    /// Hero image URL, or local path once materialized. Empty when absent.
    pub hero_image: String,
    /// Inline image URLs in document order, duplicates kept.
    pub images: Vec<String>,
    /// The page the article was scraped from.
    #[serde(rename = "url")]
    pub source_url: String,
    /// Local timestamp of persistence, `YYYY-MM-DDTHH:MM:SS`.
    pub scraped_at: String,
}

impl ArticleRecord {
    pub fn category(&self) -> Category {
        Category::new(self.category_slug.clone(), self.category_name.clone())
    }

    /// Output file name: `<categorySlug>-<slug>.json`.
    pub fn file_name(&self) -> String {
        format!("{}-{}.json", self.category_slug, self.slug)
    }
}

/// Reference to one article inside [`RunSummary`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub title: String,
    pub slug: String,
    /// Category display label.
    pub category: String,
    pub category_slug: String,
}

impl From<&ArticleRecord> for SummaryEntry {
    fn from(article: &ArticleRecord) -> Self {
        let Category { slug, name } = article.category();
        Self {
            title: article.title.clone(),
            slug: article.slug.clone(),
            category: name,
            category_slug: slug,
        }
    }
}

/// Everything produced by a single run. Overwritten each run, never merged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_articles: usize,
    pub articles: Vec<SummaryEntry>,
    pub scraped_at: String,
}

impl RunSummary {
    pub fn new(articles: Vec<SummaryEntry>, scraped_at: String) -> Self {
        Self {
            total_articles: articles.len(),
            articles,
            scraped_at,
        }
    }
}
