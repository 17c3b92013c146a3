//! JSON persistence for article records and run summaries.
//!
//! Each article becomes its own pretty-printed file so later runs (and the
//! site's import tooling) can read them back individually. The summary is
//! rewritten from scratch at the end of every run; it is never merged with
//! a previous one.

use crate::error::Result;
use crate::index::SUMMARY_FILE;
use crate::models::{ArticleRecord, RunSummary};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// Write `article` to `<output_dir>/<categorySlug>-<slug>.json`.
///
/// Creates `output_dir` if needed and overwrites an existing file of the
/// same name.
#[instrument(level = "debug", skip_all, fields(slug = %article.slug))]
pub async fn write_article(output_dir: &Path, article: &ArticleRecord) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(article)?;
    fs::create_dir_all(output_dir).await?;

    let path = output_dir.join(article.file_name());
    fs::write(&path, json).await?;
    debug!(path = %path.display(), "Wrote article JSON");
    Ok(path)
}

/// Write the run summary to `<output_dir>/summary.json`.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_summary(output_dir: &Path, summary: &RunSummary) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::create_dir_all(output_dir).await?;

    let path = output_dir.join(SUMMARY_FILE);
    fs::write(&path, json).await?;
    info!(
        path = %path.display(),
        total = summary.total_articles,
        "Wrote run summary"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SummaryEntry;

    fn record(slug: &str) -> ArticleRecord {
        ArticleRecord {
            title: "Título con acentos".to_string(),
            slug: slug.to_string(),
            category_slug: "nutrition".to_string(),
            category_name: "Nutrition".to_string(),
            content: "<p>body</p>".to_string(),
            excerpt: "short".to_string(),
            hero_image: String::new(),
            images: vec![],
            source_url: format!("https://site/articles/{slug}"),
            scraped_at: "2025-05-06T08:00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_write_article_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let article = record("complete-protein-guide");
        let path = write_article(tmp.path(), &article).await.unwrap();

        assert_eq!(
            path.file_name().unwrap(),
            "nutrition-complete-protein-guide.json"
        );
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Título con acentos"), "non-ASCII kept verbatim");
        let back: ArticleRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, article);
    }

    #[tokio::test]
    async fn test_summary_overwrites_previous_run() {
        let tmp = tempfile::tempdir().unwrap();
        let first = RunSummary::new(
            vec![
                SummaryEntry::from(&record("one-article-here")),
                SummaryEntry::from(&record("two-article-here")),
            ],
            "first".to_string(),
        );
        write_summary(tmp.path(), &first).await.unwrap();

        let second = RunSummary::new(vec![], "second".to_string());
        let path = write_summary(tmp.path(), &second).await.unwrap();

        let back: RunSummary =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back.total_articles, 0);
        assert!(back.articles.is_empty());
        assert_eq!(back.scraped_at, "second");
    }

    #[tokio::test]
    async fn test_written_article_is_picked_up_by_index() {
        let tmp = tempfile::tempdir().unwrap();
        write_article(tmp.path(), &record("complete-protein-guide"))
            .await
            .unwrap();
        write_summary(tmp.path(), &RunSummary::default()).await.unwrap();

        let index = crate::index::load_local(tmp.path()).await;
        assert!(index.contains_slug("complete-protein-guide"));
        assert!(index.contains_url("https://site/articles/complete-protein-guide"));
        assert_eq!(index.slug_count(), 1);
    }
}
