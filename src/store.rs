//! External record store.
//!
//! The site keeps imported articles in a MongoDB `articles` collection. The
//! scraper only ever reads two fields from it, `slug` and `sourceUrl`, to
//! extend its deduplication set. The store is strictly best-effort: callers
//! turn every error from it into a warning.
//!
//! The real client lives behind the `mongodb` cargo feature. Without it,
//! [`MongoStore`] still exists but every query fails with
//! [`ScrapeError::Store`], so call sites stay free of `#[cfg]`.
//!
//! Enable with: `cargo build --features mongodb`

use crate::error::{Result, ScrapeError};

/// The two fields of a stored document the scraper cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownRecord {
    pub slug: Option<String>,
    pub source_url: Option<String>,
}

/// Read-only source of already-imported articles.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// Every known article's slug and source URL.
    async fn known_records(&self) -> Result<Vec<KnownRecord>>;
}

/// MongoDB-backed [`RecordStore`].
///
/// Connects lazily on each query and closes the client before returning, so
/// no connection outlives start-up.
#[derive(Debug, Clone)]
pub struct MongoStore {
    uri: String,
    collection: String,
}

impl MongoStore {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            collection: "articles".to_string(),
        }
    }

    /// Host part of the connection string, safe to log.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.uri)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

#[cfg(feature = "mongodb")]
impl RecordStore for MongoStore {
    #[tracing::instrument(level = "info", skip_all, fields(collection = %self.collection))]
    async fn known_records(&self) -> Result<Vec<KnownRecord>> {
        use futures::TryStreamExt;
        use mongodb::Client;
        use mongodb::bson::{Document, doc};

        let store_err = |e: mongodb::error::Error| ScrapeError::Store(e.to_string());

        let client = Client::with_uri_str(&self.uri).await.map_err(store_err)?;
        let db = client.default_database().ok_or_else(|| {
            ScrapeError::Store("connection string does not name a database".to_string())
        })?;
        let collection = db.collection::<Document>(&self.collection);

        let mut cursor = collection
            .find(doc! {})
            .projection(doc! { "slug": 1, "sourceUrl": 1 })
            .await
            .map_err(store_err)?;

        let mut records = Vec::new();
        while let Some(document) = cursor.try_next().await.map_err(store_err)? {
            records.push(KnownRecord {
                slug: document.get_str("slug").ok().map(str::to_string),
                source_url: document.get_str("sourceUrl").ok().map(str::to_string),
            });
        }

        client.shutdown().await;
        tracing::info!(count = records.len(), "Read known records from store");
        Ok(records)
    }
}

#[cfg(not(feature = "mongodb"))]
impl RecordStore for MongoStore {
    async fn known_records(&self) -> Result<Vec<KnownRecord>> {
        Err(ScrapeError::Store(format!(
            "cannot read `{}`: built without the `mongodb` feature",
            self.collection
        )))
    }
}
