//! Article link discovery.
//!
//! Walks a fixed frontier of listing pages (site root, the article index,
//! each article category, and `?page=2..N` variants of the index and the
//! categories), pulls every `/articles/<segment>` link, and keeps the ones
//! that look like articles and have not been processed before.
//!
//! # Classification heuristic
//!
//! A link is an article when it contains `.html`, or when its last path
//! segment is longer than `min_slug_len` and is not a known taxonomy slug.
//! This misfiles short-slug articles as listings and long-slug listings as
//! articles; both are accepted limitations of working from the URL alone.

use crate::config::ScraperConfig;
use crate::error::Result;
use crate::http::Fetcher;
use crate::index::{ExistingIndex, normalize_slug};
use crate::throttle::Throttle;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Category index pages under `/articles/`.
pub const ARTICLE_CATEGORIES: [&str; 12] = [
    "muscle-building",
    "fat-loss",
    "training",
    "nutrition",
    "supplements",
    "women",
    "motivation",
    "recovery",
    "sports-performance",
    "injury-prevention",
    "fitness-lifestyle",
    "athlete-profiles",
];

/// Substrings that mark support, tool, tracking, or pagination URLs.
const NON_ARTICLE_PATTERNS: &[&str] = &[
    "/support.",
    "/tools/",
    "/workout-plans/",
    "/calculators/",
    "/node/",
    "?_gl=",
    "&ajax=",
    "page=",
    "?page=",
];

/// Taxonomy slugs that show up as `/articles/<slug>` listing pages.
pub const CATEGORY_SLUGS: &[&str] = &[
    "training",
    "nutrition",
    "workouts",
    "supplements",
    "muscle-building",
    "fat-loss",
    "women",
    "motivation",
    "lifestyle",
    "injury",
    "sport",
    "recovery",
    "interviews",
    "men",
    "abs",
    "full-body",
    "sports-performance",
    "bodyweight",
    "beginner",
    "at-home",
    "celebrity",
    "cardio",
    "chest",
    "back",
    "biceps",
    "shoulders",
    "legs",
    "triceps",
    "glutes",
    "strength",
    "protein-shakes",
    "protein-bars",
    "high-protein",
    "low-carb",
    "snacks",
    "vegetarian",
    "breakfast",
    "lunch",
    "dinner",
    "bbq-grill",
    "abductors",
    "adductors",
    "calves",
    "forearms",
    "hamstrings",
    "hip-flexors",
    "it-band",
    "lats",
    "lower-back",
    "upper-back",
    "neck",
    "obliques",
    "quadriceps",
    "traps",
    "athlete-profiles",
    "injury-prevention",
    "fitness-lifestyle",
];

/// Known article paths used to top up a thin discovery pass.
const FALLBACK_PATHS: &[&str] = &[
    "/articles/how-to-build-muscle",
    "/articles/best-exercises-for-chest",
    "/articles/complete-protein-guide",
    "/articles/bulking-diet-plan",
    "/articles/hypertrophy-training-guide",
    "/articles/calorie-deficit-explained",
    "/articles/best-back-exercises",
    "/articles/creatine-complete-guide",
    "/articles/pre-workout-supplements",
    "/articles/cardio-for-fat-loss",
    "/articles/fat-loss-nutrition-plan",
    "/articles/meal-prep-guide",
    "/articles/beginner-workout-program",
    "/articles/shoulder-exercises",
    "/articles/leg-day-routine",
    "/articles/supplement-buying-guide",
    "/articles/nutrition-basics",
    "/articles/muscle-recovery",
    "/articles/training-frequency",
    "/articles/core-exercises",
];

static ARTICLE_HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/articles/[^/?#]+").expect("valid article href regex"));

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid link selector"));

/// Discovery knobs, split out of [`ScraperConfig`].
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub base_url: Url,
    pub last_listing_page: u32,
    pub min_articles: usize,
    pub min_slug_len: usize,
}

impl DiscoveryConfig {
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url()?,
            last_listing_page: config.last_listing_page,
            min_articles: config.min_articles,
            min_slug_len: config.min_slug_len,
        })
    }
}

/// Join a site-absolute path onto the base URL as a string.
fn site_url(base: &Url, path: &str) -> String {
    base.join(path)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}{}", base.as_str().trim_end_matches('/'), path))
}

/// The statically enumerated crawl frontier, in crawl order.
pub fn listing_pages(base: &Url, last_page: u32) -> Vec<String> {
    let mut pages = vec![base.to_string(), site_url(base, "/articles")];
    for category in ARTICLE_CATEGORIES {
        pages.push(site_url(base, &format!("/articles/{category}")));
    }
    for page in 2..=last_page {
        pages.push(site_url(base, &format!("/articles?page={page}")));
        for category in ARTICLE_CATEGORIES {
            pages.push(site_url(base, &format!("/articles/{category}?page={page}")));
        }
    }
    pages
}

/// Text after the last `/` with `.html` removed. Query strings are kept, so
/// they take part in classification.
pub fn link_slug(url: &str) -> String {
    normalize_slug(url.rsplit('/').next().unwrap_or_default())
}

/// Whether an absolute link looks like an article page.
pub fn is_article_url(url: &str, min_slug_len: usize) -> bool {
    if !url.contains("/articles/") {
        return false;
    }
    if NON_ARTICLE_PATTERNS.iter().any(|p| url.contains(p)) {
        return false;
    }
    if url.contains(".html") {
        return true;
    }
    let slug = link_slug(url);
    slug.chars().count() > min_slug_len && !CATEGORY_SLUGS.contains(&slug.as_str())
}

/// Every `/articles/<segment>` link on a page, made absolute, in document
/// order. Hrefs that are neither site-absolute nor `http(s)` are dropped.
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| ARTICLE_HREF_RE.is_match(href))
        .filter_map(|href| {
            if href.starts_with('/') {
                base.join(href).ok().map(|u| u.to_string())
            } else if href.starts_with("http") {
                Some(href.to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Accepted article URLs for one discovery pass.
#[derive(Debug)]
pub struct Candidates<'a> {
    index: &'a ExistingIndex,
    min_slug_len: usize,
    accepted: Vec<String>,
    seen: HashSet<String>,
}

impl<'a> Candidates<'a> {
    pub fn new(index: &'a ExistingIndex, min_slug_len: usize) -> Self {
        Self {
            index,
            min_slug_len,
            accepted: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Consider one discovered link. Returns `true` if it was accepted.
    pub fn offer(&mut self, url: &str) -> bool {
        if self.index.contains(&link_slug(url), url) || self.seen.contains(url) {
            return false;
        }
        if !is_article_url(url, self.min_slug_len) {
            return false;
        }
        self.seen.insert(url.to_string());
        self.accepted.push(url.to_string());
        true
    }

    /// Top up from the fallback list until `min_articles` is reached. Fallback
    /// entries only go through the index and duplicate checks.
    pub fn fill_from_fallback(&mut self, base: &Url, min_articles: usize) -> usize {
        if self.accepted.len() >= min_articles {
            return 0;
        }
        let mut added = 0;
        for path in FALLBACK_PATHS {
            let url = site_url(base, path);
            if self.index.contains(&link_slug(&url), &url) || self.seen.contains(&url) {
                continue;
            }
            self.seen.insert(url.clone());
            self.accepted.push(url);
            added += 1;
            if self.accepted.len() >= min_articles {
                break;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn into_urls(self) -> Vec<String> {
        self.accepted
    }
}

/// Walks the listing frontier and collects new article URLs.
#[derive(Debug)]
pub struct Discoverer<'a> {
    fetcher: &'a Fetcher,
    index: &'a ExistingIndex,
    config: DiscoveryConfig,
    throttle: Throttle,
}

impl<'a> Discoverer<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        index: &'a ExistingIndex,
        config: DiscoveryConfig,
        throttle: Throttle,
    ) -> Self {
        Self {
            fetcher,
            index,
            config,
            throttle,
        }
    }

    /// Collect new article URLs from every listing page.
    ///
    /// Pages are fetched one at a time with the listing delay between them.
    /// A listing page that fails to load is logged and skipped. When fewer
    /// than `min_articles` URLs were found, the fallback list tops them up.
    ///
    /// # Returns
    ///
    /// Ordered, deduplicated absolute article URLs that are not present in
    /// the existing-record index. Empty when every page failed and the
    /// fallback list is already known.
    #[instrument(level = "info", skip_all, fields(base = %self.config.base_url))]
    pub async fn discover(&mut self) -> Vec<String> {
        let mut candidates = Candidates::new(self.index, self.config.min_slug_len);
        let pages = listing_pages(&self.config.base_url, self.config.last_listing_page);
        info!(pages = pages.len(), "Checking listing pages");

        for page in &pages {
            self.throttle.wait().await;
            debug!(%page, "Checking listing page");
            let html = match self.fetcher.fetch_text(page).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(%page, error = %e, "Listing page fetch failed; skipping");
                    continue;
                }
            };

            let links = extract_links(&html, &self.config.base_url);
            let accepted = links.iter().filter(|url| candidates.offer(url)).count();
            debug!(%page, links = links.len(), accepted, "Scanned listing page");
        }

        let discovered = candidates.len();
        let fallback = candidates.fill_from_fallback(&self.config.base_url, self.config.min_articles);
        if fallback > 0 {
            info!(discovered, fallback, "Topped up with fallback article list");
        }

        let urls = candidates.into_urls();
        info!(count = urls.len(), "Found new articles to scrape");
        urls
    }
}
