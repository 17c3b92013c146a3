//! Article page extraction.
//!
//! Turns a fetched article page into an [`ArticleRecord`]. Each field is
//! resolved through a priority table: the rules are tried in order and the
//! first one producing a non-empty value wins.
//!
//! | Field | Rules, in priority order |
//! |-------|--------------------------|
//! | title | `h1`, `title`, literal placeholder |
//! | category | URL section, in-page category link, any taxonomy link, `general` |
//! | content | `article`, `div` with content class, `main`, `div.content` |
//! | excerpt | `og:description`, `meta[name=description]`, first paragraph |
//! | hero image | `og:image`, `img` with hero/featured/main class |
//!
//! Before the content block is serialized, scripts, styles, navigation,
//! headers, footers and anything whose class looks like an ad or share
//! widget are removed from it.

use crate::error::{Result, ScrapeError};
use crate::index::normalize_slug;
use crate::models::{ArticleRecord, Category};
use crate::utils::{filesystem_safe, title_from_slug, truncate_for_log};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

const UNTITLED: &str = "Untitled Article";
const EXCERPT_MAX_CHARS: usize = 200;

/// Section roots whose articles carry a fixed category. `articles` is
/// refined further from the page.
const SECTION_CATEGORIES: &[(&str, &str, &str)] = &[
    ("articles", "articles", "Articles"),
    ("workout-routines", "workouts", "Workouts"),
    ("exercises", "exercises", "Exercises"),
    ("diet-plans", "diet-plans", "Diet Plans"),
    ("recipes", "recipes", "Recipes"),
];

static CATEGORY_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"/articles/(training|nutrition|supplements|muscle-building|fat-loss|women|motivation|recovery|sports-performance|injury-prevention|fitness-lifestyle|athlete-profiles)",
    )
    .expect("valid category link regex")
});

static TAXONOMY_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/categories/|/category/|/articles/").expect("valid taxonomy link regex")
});

static CONTENT_CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"article-content|post-content|entry-content").expect("valid content class regex")
});

static HERO_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"hero|featured|main").expect("valid hero class regex"));

static AD_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ad|advertisement|social-share").expect("valid ad class regex"));

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| css("a[href]"));
static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| css("p"));
static IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| css("img"));
static BOILERPLATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| css("script, style, nav, header, footer"));
static CLASSED_SELECTOR: Lazy<Selector> = Lazy::new(|| css("[class]"));

fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("valid static selector")
}

/// One entry of a priority table: a CSS selector, optionally narrowed to
/// elements with a class token matching a pattern.
#[derive(Debug)]
pub struct ElementRule {
    pub label: &'static str,
    selector: Selector,
    class_pattern: Option<&'static Lazy<Regex>>,
}

impl ElementRule {
    fn new(label: &'static str, selector: &str) -> Self {
        Self {
            label,
            selector: css(selector),
            class_pattern: None,
        }
    }

    fn with_class(label: &'static str, selector: &str, pattern: &'static Lazy<Regex>) -> Self {
        Self {
            label,
            selector: css(selector),
            class_pattern: Some(pattern),
        }
    }

    fn matches(&self, element: &ElementRef<'_>) -> bool {
        match self.class_pattern {
            Some(re) => element.value().classes().any(|class| re.is_match(class)),
            None => true,
        }
    }

    /// First element under `scope` this rule accepts.
    pub fn first<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        scope.select(&self.selector).find(|el| self.matches(el))
    }
}

/// A rule whose value is read from attributes, first non-empty wins.
#[derive(Debug)]
pub struct AttrRule {
    pub rule: ElementRule,
    attrs: &'static [&'static str],
}

impl AttrRule {
    fn new(rule: ElementRule, attrs: &'static [&'static str]) -> Self {
        Self { rule, attrs }
    }

    pub fn value(&self, scope: ElementRef<'_>) -> Option<String> {
        let element = self.rule.first(scope)?;
        self.attrs
            .iter()
            .filter_map(|attr| element.value().attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }
}

pub static TITLE_RULES: Lazy<Vec<ElementRule>> = Lazy::new(|| {
    vec![
        ElementRule::new("heading", "h1"),
        ElementRule::new("document title", "title"),
    ]
});

pub static CONTENT_RULES: Lazy<Vec<ElementRule>> = Lazy::new(|| {
    vec![
        ElementRule::new("article element", "article"),
        ElementRule::with_class("content class", "div", &CONTENT_CLASS_RE),
        ElementRule::new("main element", "main"),
        ElementRule::new("generic content div", "div.content"),
    ]
});

pub static EXCERPT_RULES: Lazy<Vec<AttrRule>> = Lazy::new(|| {
    vec![
        AttrRule::new(
            ElementRule::new("og:description", r#"meta[property="og:description"]"#),
            &["content"],
        ),
        AttrRule::new(
            ElementRule::new("meta description", r#"meta[name="description"]"#),
            &["content"],
        ),
    ]
});

pub static HERO_RULES: Lazy<Vec<AttrRule>> = Lazy::new(|| {
    vec![
        AttrRule::new(
            ElementRule::new("og:image", r#"meta[property="og:image"]"#),
            &["content"],
        ),
        AttrRule::new(
            ElementRule::with_class("hero class", "img", &HERO_CLASS_RE),
            &["src", "data-src"],
        ),
    ]
});

/// Attributes an inline image's source may live in, in order.
const IMAGE_SOURCE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src"];

/// First element matched by any rule, with the label of the rule that hit.
pub fn first_match<'a>(
    rules: &[ElementRule],
    scope: ElementRef<'a>,
) -> Option<(&'static str, ElementRef<'a>)> {
    rules
        .iter()
        .find_map(|rule| rule.first(scope).map(|el| (rule.label, el)))
}

/// First non-empty attribute value produced by any rule.
pub fn first_value(rules: &[AttrRule], scope: ElementRef<'_>) -> Option<String> {
    rules.iter().find_map(|rule| rule.value(scope))
}

/// Element text with every text node trimmed and concatenated.
fn stripped_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect::<String>()
}

/// Slug of an article URL: the last non-empty path segment, made
/// filesystem-safe.
pub fn slug_from_url(url: &Url) -> Option<String> {
    let segment = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()?;
    let slug = filesystem_safe(segment);
    (!slug.is_empty()).then_some(slug)
}

/// Last `/`-separated piece of an href, `.html` removed.
fn href_slug(href: &str) -> String {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    normalize_slug(path.trim_end_matches('/').rsplit('/').next().unwrap_or_default())
}

fn link_category(link: ElementRef<'_>, slug: String) -> Category {
    let text = stripped_text(link);
    let name = if text.is_empty() {
        title_from_slug(&slug)
    } else {
        text
    };
    Category::new(slug, name)
}

/// Category from the URL's section, refined from the page for `/articles/`.
fn category_from_section(url: &Url, root: ElementRef<'_>) -> Option<Category> {
    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .collect();
    if segments.len() < 2 {
        return None;
    }
    let (section, slug, name) = SECTION_CATEGORIES
        .iter()
        .find(|(section, _, _)| *section == segments[0])?;

    if *section == "articles" {
        let in_page = root
            .select(&LINK_SELECTOR)
            .find(|a| a.value().attr("href").is_some_and(|h| CATEGORY_LINK_RE.is_match(h)));
        if let Some(link) = in_page {
            let href_slug = href_slug(link.value().attr("href").unwrap_or_default());
            if !href_slug.is_empty() {
                return Some(link_category(link, href_slug));
            }
        }
    }
    Some(Category::new(*slug, *name))
}

/// Category from the first taxonomy-looking link on the page.
fn category_from_taxonomy_link(root: ElementRef<'_>) -> Option<Category> {
    let link = root
        .select(&LINK_SELECTOR)
        .find(|a| a.value().attr("href").is_some_and(|h| TAXONOMY_LINK_RE.is_match(h)))?;
    let slug = href_slug(link.value().attr("href").unwrap_or_default());
    let is_section = SECTION_CATEGORIES.iter().any(|(section, _, _)| *section == slug);
    if slug.is_empty() || is_section {
        return None;
    }
    Some(link_category(link, slug))
}

/// Resolve a possibly relative image source against the site root.
fn absolutize(src: &str, base: &Url) -> Option<String> {
    if src.starts_with("http") {
        Some(src.to_string())
    } else {
        base.join(src).ok().map(|u| u.to_string())
    }
}

/// Builds [`ArticleRecord`]s from article pages.
#[derive(Debug, Clone)]
pub struct Extractor {
    base_url: Url,
    site_name_suffix: String,
}

impl Extractor {
    pub fn new(base_url: Url, site_name_suffix: impl Into<String>) -> Self {
        Self {
            base_url,
            site_name_suffix: site_name_suffix.into(),
        }
    }

    /// Extract an article from `html` fetched from `url`.
    ///
    /// Title and category are read from the intact page. The content block is
    /// then stripped of boilerplate before content, excerpt and inline images
    /// are read from it. Missing fields are not an error: they come back
    /// empty, and the title falls back to a placeholder.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL the page was fetched from; its last path
    ///   segment becomes the slug
    /// * `html` - Raw page body
    ///
    /// # Returns
    ///
    /// The [`ArticleRecord`] with an empty `scraped_at`, or
    /// [`ScrapeError::InvalidUrl`] / [`ScrapeError::Parse`] when `url` cannot
    /// name a record.
    #[instrument(level = "debug", skip(self, html))]
    pub fn extract(&self, url: &str, html: &str) -> Result<ArticleRecord> {
        let parsed = Url::parse(url).map_err(|e| ScrapeError::InvalidUrl(format!("{url}: {e}")))?;
        let slug = slug_from_url(&parsed).ok_or_else(|| ScrapeError::Parse {
            url: url.to_string(),
            reason: "URL path has no slug".to_string(),
        })?;

        let mut document = Html::parse_document(html);
        let root = document.root_element();

        let title = self.title(root);
        let category = category_from_section(&parsed, root)
            .or_else(|| category_from_taxonomy_link(root))
            .unwrap_or_else(Category::general);
        let category_slug = filesystem_safe(&category.slug);

        let container = first_match(&CONTENT_RULES, root).map(|(label, el)| {
            debug!(rule = label, "Selected content container");
            el.id()
        });

        // Strip boilerplate from the container before anything reads it.
        if let Some(container_id) = container {
            let doomed: Vec<_> = document
                .tree
                .get(container_id)
                .and_then(ElementRef::wrap)
                .map(|el| {
                    el.select(&BOILERPLATE_SELECTOR)
                        .chain(el.select(&CLASSED_SELECTOR).filter(|c| {
                            c.value().classes().any(|class| AD_CLASS_RE.is_match(class))
                        }))
                        .map(|c| c.id())
                        .collect()
                })
                .unwrap_or_default();
            for id in doomed {
                if let Some(mut node) = document.tree.get_mut(id) {
                    node.detach();
                }
            }
        }

        let root = document.root_element();
        let content_el = container
            .and_then(|id| document.tree.get(id))
            .and_then(ElementRef::wrap);

        let content = content_el.map(|el| el.html()).unwrap_or_default();

        let excerpt = first_value(&EXCERPT_RULES, root)
            .or_else(|| {
                let paragraph = content_el?.select(&PARAGRAPH_SELECTOR).next()?;
                Some(stripped_text(paragraph).chars().take(EXCERPT_MAX_CHARS).collect())
            })
            .unwrap_or_default();

        let hero_image = first_value(&HERO_RULES, root).unwrap_or_default();

        let images = content_el
            .map(|el| self.inline_images(el))
            .unwrap_or_default();

        debug!(
            %title,
            category = %category_slug,
            content_bytes = content.len(),
            excerpt = %truncate_for_log(&excerpt, 80),
            images = images.len(),
            "Extracted article"
        );

        Ok(ArticleRecord {
            title,
            slug,
            category_slug,
            category_name: category.name,
            content,
            excerpt,
            hero_image,
            images,
            source_url: url.to_string(),
            scraped_at: String::new(),
        })
    }

    fn title(&self, root: ElementRef<'_>) -> String {
        let raw = TITLE_RULES
            .iter()
            .filter_map(|rule| rule.first(root))
            .map(stripped_text)
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());
        let title = if self.site_name_suffix.is_empty() {
            raw.as_str()
        } else {
            raw.trim_end_matches(self.site_name_suffix.as_str())
        };
        title.trim().to_string()
    }

    /// Image sources inside the content block, in document order, duplicates
    /// kept. Data URIs and placeholders are skipped.
    fn inline_images(&self, content: ElementRef<'_>) -> Vec<String> {
        content
            .select(&IMAGE_SELECTOR)
            .filter_map(|img| {
                IMAGE_SOURCE_ATTRS
                    .iter()
                    .filter_map(|attr| img.value().attr(attr))
                    .map(str::trim)
                    .find(|src| !src.is_empty())
            })
            .filter(|src| !src.starts_with("data:") && !src.to_lowercase().contains("placeholder"))
            .filter_map(|src| absolutize(src, &self.base_url))
            .collect()
    }
}
