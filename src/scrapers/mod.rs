//! Site scraping.
//!
//! Scraping follows a two-phase pattern:
//!
//! 1. **Discovery** ([`discover`]): walk the site's listing pages and collect
//!    article URLs that have not been processed before
//! 2. **Extraction** ([`extract`]): turn each fetched article page into an
//!    [`ArticleRecord`](crate::models::ArticleRecord)
//!
//! Both phases work from HTML alone, so they are tied to the site's current
//! markup: selectors and URL patterns live in tables at the top of each
//! module.

pub mod discover;
pub mod extract;
