//! Image materialization.
//!
//! Downloads an article's hero and inline images into
//! `<images_dir>/<categorySlug>/<slug>/` and points the record at the local
//! copies:
//!
//! ```text
//! images_dir/
//! └── training/
//!     └── how-to-build-muscle/
//!         ├── hero.jpg
//!         ├── image-1.png
//!         └── image-2.jpg
//! ```
//!
//! Downloads are best-effort. A failed image keeps its remote URL in the
//! record; the others are still fetched and rewritten.

use crate::http::Fetcher;
use crate::models::ArticleRecord;
use crate::throttle::Throttle;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use url::Url;

const DEFAULT_EXTENSION: &str = ".jpg";

/// Original remote URL to local public path.
pub type RewriteMap = HashMap<String, String>;

/// File extension of the URL's path including the dot, `.jpg` when absent.
pub fn extension_for(url: &str, base: &Url) -> String {
    let path = Url::parse(url)
        .or_else(|_| base.join(url))
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    Path::new(&path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Replace every downloaded URL in `content` with its local path.
///
/// Only whole quoted attribute values are replaced, so a URL that merely
/// prefixes or appears inside another URL is left alone. Serialized HTML
/// escapes `&` in attributes, so the `&amp;` form of each URL is matched too.
pub fn rewrite_content(content: &str, rewrites: &RewriteMap) -> String {
    let mut pairs: Vec<(&String, &String)> = rewrites.iter().collect();
    pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut out = content.to_string();
    for (from, to) in pairs {
        let escaped = from.replace('&', "&amp;");
        let mut forms = vec![from.as_str()];
        if escaped != *from {
            forms.push(escaped.as_str());
        }
        for form in forms {
            for quote in ['"', '\''] {
                out = out.replace(&format!("{quote}{form}{quote}"), &format!("{quote}{to}{quote}"));
            }
        }
    }
    out
}

#[derive(Debug)]
pub struct ImageMaterializer<'a> {
    fetcher: &'a Fetcher,
    base_url: Url,
    images_dir: PathBuf,
    public_prefix: String,
    throttle: Throttle,
}

impl<'a> ImageMaterializer<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        base_url: Url,
        images_dir: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
        throttle: Throttle,
    ) -> Self {
        Self {
            fetcher,
            base_url,
            images_dir: images_dir.into(),
            public_prefix: public_prefix.into(),
            throttle,
        }
    }

    fn article_dir(&self, article: &ArticleRecord) -> PathBuf {
        self.images_dir
            .join(&article.category_slug)
            .join(&article.slug)
    }

    fn public_path(&self, article: &ArticleRecord, file_name: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.public_prefix.trim_end_matches('/'),
            article.category_slug,
            article.slug,
            file_name
        )
    }

    /// Absolute form of an image URL, resolved against the site root.
    fn resolve(&self, url: &str) -> Option<String> {
        if url.starts_with("http") {
            return Some(url.to_string());
        }
        match self.base_url.join(url) {
            Ok(u) => Some(u.to_string()),
            Err(e) => {
                warn!(%url, error = %e, "Unresolvable image URL");
                None
            }
        }
    }

    /// Download one absolute image URL; `Some(public path)` on success.
    async fn fetch_one(
        &self,
        article: &ArticleRecord,
        url: &str,
        file_name: &str,
    ) -> Option<String> {
        let dest = self.article_dir(article).join(file_name);
        match self.fetcher.download(url, &dest).await {
            Ok(bytes) => {
                debug!(%url, dest = %dest.display(), bytes, "Downloaded image");
                Some(self.public_path(article, file_name))
            }
            Err(e) => {
                warn!(%url, error = %e, "Failed to download image");
                None
            }
        }
    }

    /// Download the article's images and rewrite it to reference them.
    ///
    /// The hero image is saved as `hero{ext}` and the n-th inline image as
    /// `image-{n}{ext}`, all under `<images_dir>/<categorySlug>/<slug>/`. A URL
    /// seen twice in one article, including the hero reappearing inline, is
    /// fetched once and always maps to the same path.
    ///
    /// # Arguments
    ///
    /// * `article` - The extracted record. `hero_image`, matching `images`
    ///   entries and matching attribute values in `content` are replaced in
    ///   place for every image that downloaded.
    ///
    /// # Returns
    ///
    /// The map from absolute remote URL to local public path, one entry per
    /// image that downloaded. Failed images are absent and keep their remote
    /// URL in the record.
    #[instrument(level = "info", skip_all, fields(slug = %article.slug, category = %article.category_slug))]
    pub async fn materialize(&mut self, article: &mut ArticleRecord) -> RewriteMap {
        let mut rewrites = RewriteMap::new();

        if !article.hero_image.is_empty() {
            if let Some(hero) = self.resolve(&article.hero_image) {
                let file_name = format!("hero{}", extension_for(&hero, &self.base_url));
                if let Some(local) = self.fetch_one(article, &hero, &file_name).await {
                    rewrites.insert(hero, local);
                }
            }
        }

        let total = article.images.len();
        for (i, url) in article.images.iter().enumerate() {
            let Some(remote) = self.resolve(url) else {
                continue;
            };
            if rewrites.contains_key(&remote) {
                continue;
            }
            self.throttle.wait().await;
            let file_name = format!("image-{}{}", i + 1, extension_for(&remote, &self.base_url));
            if let Some(local) = self.fetch_one(article, &remote, &file_name).await {
                debug!(index = i + 1, total, "Downloaded inline image");
                rewrites.insert(remote, local);
            }
        }

        let local_for = |url: &str| -> Option<String> {
            if url.is_empty() {
                return None;
            }
            self.resolve(url).and_then(|remote| rewrites.get(&remote).cloned())
        };
        if let Some(local) = local_for(&article.hero_image) {
            article.hero_image = local;
        }
        for image in article.images.iter_mut() {
            if let Some(local) = local_for(image) {
                *image = local;
            }
        }
        article.content = rewrite_content(&article.content, &rewrites);

        info!(
            downloaded = rewrites.len(),
            inline = total,
            "Materialized images"
        );
        rewrites
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::time::Duration;

    fn article(base: &str, hero: &str, images: &[&str]) -> ArticleRecord {
        let content = images
            .iter()
            .map(|u| format!(r#"<img src="{u}">"#))
            .collect::<Vec<_>>()
            .join("");
        ArticleRecord {
            title: "Test Article".to_string(),
            slug: "test-article-guide".to_string(),
            category_slug: "articles".to_string(),
            category_name: "Articles".to_string(),
            content: format!("<article>{content}</article>"),
            excerpt: String::new(),
            hero_image: hero.to_string(),
            images: images.iter().map(|s| s.to_string()).collect(),
            source_url: format!("{base}/articles/test-article-guide"),
            scraped_at: String::new(),
        }
    }

    #[test]
    fn test_extension_rules() {
        let base = Url::parse("https://site").unwrap();
        assert_eq!(extension_for("https://site/img/hero.png", &base), ".png");
        assert_eq!(extension_for("https://site/img/photo.webp?w=800", &base), ".webp");
        assert_eq!(extension_for("https://site/img/photo", &base), ".jpg");
        assert_eq!(extension_for("/img/relative.gif", &base), ".gif");
        assert_eq!(extension_for("https://site/", &base), ".jpg");
    }

    #[test]
    fn test_rewrite_content_longest_first() {
        let mut map = RewriteMap::new();
        map.insert("https://s/a.jpg".to_string(), "/local/1.jpg".to_string());
        map.insert("https://s/a.jpg.webp".to_string(), "/local/2.webp".to_string());
        let out = rewrite_content(r#"<img src="https://s/a.jpg.webp"><img src="https://s/a.jpg">"#, &map);
        assert_eq!(out, r#"<img src="/local/2.webp"><img src="/local/1.jpg">"#);
    }

    #[test]
    fn test_rewrite_content_only_replaces_whole_values() {
        let mut map = RewriteMap::new();
        map.insert("https://s/a.jpg".to_string(), "/local/1.jpg".to_string());
        let content = r#"<img src="https://s/a.jpg?w=800"><img src="https://s/a.jpg"><p>https://s/a.jpg</p>"#;
        assert_eq!(
            rewrite_content(content, &map),
            r#"<img src="https://s/a.jpg?w=800"><img src="/local/1.jpg"><p>https://s/a.jpg</p>"#
        );
    }

    #[test]
    fn test_rewrite_content_matches_escaped_ampersands() {
        let mut map = RewriteMap::new();
        map.insert("https://s/i.jpg?w=1&h=2".to_string(), "/local/1.jpg".to_string());
        let out = rewrite_content(r#"<img src="https://s/i.jpg?w=1&amp;h=2"><img src='https://s/i.jpg?w=1&h=2'>"#, &map);
        assert_eq!(out, r#"<img src="/local/1.jpg"><img src='/local/1.jpg'>"#);
    }

    #[tokio::test]
    async fn test_failed_url_sharing_a_prefix_is_untouched() {
        let mut server = Server::new_async().await;
        let _ok = server
            .mock("GET", "/img/a.jpg")
            .with_status(200)
            .with_body("x")
            .create_async()
            .await;
        let _converted = server
            .mock("GET", "/img/a.jpg.webp")
            .with_status(404)
            .create_async()
            .await;

        let base = server.url();
        let plain = format!("{base}/img/a.jpg");
        let converted = format!("{base}/img/a.jpg.webp");
        let mut record = article(&base, "", &[plain.as_str(), converted.as_str()]);

        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        let mut materializer = ImageMaterializer::new(
            &fetcher,
            Url::parse(&base).unwrap(),
            tmp.path(),
            "/images/articles",
            Throttle::disabled(),
        );
        let map = materializer.materialize(&mut record).await;

        assert_eq!(map.len(), 1);
        assert!(record.content.contains(&format!(r#"src="{converted}""#)));
        assert!(record
            .content
            .contains(r#"src="/images/articles/articles/test-article-guide/image-1.jpg""#));
        assert_eq!(record.images[1], converted);
    }

    #[tokio::test]
    async fn test_relative_hero_does_not_touch_foreign_urls() {
        let mut server = Server::new_async().await;
        let _hero = server
            .mock("GET", "/img/hero.png")
            .with_status(200)
            .with_body("hero")
            .create_async()
            .await;

        let base = server.url();
        // Same path on a host that refuses connections.
        let foreign = "http://127.0.0.1:9/img/hero.png";
        let mut record = article(&base, "/img/hero.png", &[foreign]);

        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        let mut materializer = ImageMaterializer::new(
            &fetcher,
            Url::parse(&base).unwrap(),
            tmp.path(),
            "/images/articles",
            Throttle::disabled(),
        );
        let map = materializer.materialize(&mut record).await;

        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&format!("{base}/img/hero.png")));
        assert_eq!(
            record.hero_image,
            "/images/articles/articles/test-article-guide/hero.png"
        );
        assert_eq!(record.images, vec![foreign.to_string()]);
        assert!(record.content.contains(&format!(r#"src="{foreign}""#)));
    }

    #[tokio::test]
    async fn test_hero_and_inline_images_are_materialized() {
        let mut server = Server::new_async().await;
        let _hero = server
            .mock("GET", "/img/hero.png")
            .with_status(200)
            .with_body("hero-bytes")
            .create_async()
            .await;
        let _body = server
            .mock("GET", "/img/body.png")
            .with_status(200)
            .with_body("body-bytes")
            .create_async()
            .await;

        let base = server.url();
        let hero = format!("{base}/img/hero.png");
        let body = format!("{base}/img/body.png");
        let mut record = article(&base, &hero, &[body.as_str()]);

        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        let mut materializer = ImageMaterializer::new(
            &fetcher,
            Url::parse(&base).unwrap(),
            tmp.path(),
            "/images/articles",
            Throttle::disabled(),
        );
        let map = materializer.materialize(&mut record).await;

        assert_eq!(map.len(), 2);
        assert_eq!(
            record.hero_image,
            "/images/articles/articles/test-article-guide/hero.png"
        );
        assert_eq!(
            record.images,
            vec!["/images/articles/articles/test-article-guide/image-1.png".to_string()]
        );
        assert!(!record.content.contains(&body));
        assert_eq!(
            record
                .content
                .matches("/images/articles/articles/test-article-guide/image-1.png")
                .count(),
            1
        );

        let dir = tmp.path().join("articles/test-article-guide");
        assert_eq!(std::fs::read(dir.join("hero.png")).unwrap(), b"hero-bytes");
        assert_eq!(std::fs::read(dir.join("image-1.png")).unwrap(), b"body-bytes");
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_remaining_urls() {
        let mut server = Server::new_async().await;
        let mut mocks = Vec::new();
        for (path, status) in [
            ("/img/1.jpg", 200),
            ("/img/2.jpg", 404),
            ("/img/3.jpg", 200),
            ("/img/4.jpg", 500),
            ("/img/5.jpg", 200),
        ] {
            mocks.push(
                server
                    .mock("GET", path)
                    .with_status(status)
                    .with_body("x")
                    .create_async()
                    .await,
            );
        }

        let base = server.url();
        let urls: Vec<String> = (1..=5).map(|i| format!("{base}/img/{i}.jpg")).collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let mut record = article(&base, "", &refs);

        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        let mut materializer = ImageMaterializer::new(
            &fetcher,
            Url::parse(&base).unwrap(),
            tmp.path(),
            "/images/articles",
            Throttle::disabled(),
        );
        let map = materializer.materialize(&mut record).await;

        assert_eq!(map.len(), 3);
        assert!(record.content.contains(&urls[1]));
        assert!(record.content.contains(&urls[3]));
        for i in [0usize, 2, 4] {
            assert!(!record.content.contains(&urls[i]));
            assert!(record.content.contains(&format!(
                "/images/articles/articles/test-article-guide/image-{}.jpg",
                i + 1
            )));
        }
        assert_eq!(record.images[1], urls[1]);
        assert_eq!(record.hero_image, "");
    }

    #[tokio::test]
    async fn test_repeated_url_maps_to_one_path() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/img/same.png")
            .with_status(200)
            .with_body("x")
            .expect(1)
            .create_async()
            .await;

        let base = server.url();
        let same = format!("{base}/img/same.png");
        let mut record = article(&base, "", &[same.as_str(), same.as_str()]);

        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        let mut materializer = ImageMaterializer::new(
            &fetcher,
            Url::parse(&base).unwrap(),
            tmp.path(),
            "/images/articles",
            Throttle::disabled(),
        );
        let map = materializer.materialize(&mut record).await;

        mock.assert_async().await;
        assert_eq!(map.len(), 1);
        let local = "/images/articles/articles/test-article-guide/image-1.png";
        assert_eq!(record.images, vec![local.to_string(), local.to_string()]);
        assert_eq!(record.content.matches(local).count(), 2);
    }
}
