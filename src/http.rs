//! Page fetcher.
//!
//! One reqwest client shared by discovery, article fetching, and image
//! downloads. Every request carries the same browser-like header set and a
//! fixed timeout. There is no retry: a failure is returned to the caller,
//! which decides whether to skip and move on.

use crate::error::{Result, ScrapeError};
use reqwest::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION, HeaderMap, HeaderName, HeaderValue,
    UPGRADE_INSECURE_REQUESTS,
};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Headers a desktop Chrome sends on a top-level navigation.
/// `Accept-Encoding` is left to reqwest so it only advertises what it can decode.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .timeout(timeout)
            .build()
            .map_err(|e| ScrapeError::Config(format!("could not build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    /// GET `url` and return the body as text.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let body = self
            .get(url)
            .await?
            .text()
            .await
            .map_err(|e| ScrapeError::fetch(url, e))?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }

    /// Stream `url` into the file at `dest`, creating parent directories.
    ///
    /// Returns the number of bytes written. A partially written file is
    /// removed when the stream fails midway.
    #[instrument(level = "debug", skip(self, dest), fields(dest = %dest.display()))]
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self.get(url).await?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(dest).await?;

        let streamed = async {
            let mut written = 0u64;
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| ScrapeError::fetch(url, e))?
            {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<_, ScrapeError>(written)
        }
        .await;

        let written = match streamed {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                if let Err(rm) = fs::remove_file(dest).await {
                    warn!(error = %rm, "Could not remove partial download");
                }
                return Err(e);
            }
        };

        debug!(bytes = written, "Downloaded file");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::io::Write as _;

    fn fetcher() -> Fetcher {
        Fetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_text_sends_browser_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/articles")
            .match_header("user-agent", USER_AGENT)
            .match_header("accept-language", "en-US,en;q=0.9")
            .match_header("sec-fetch-mode", "navigate")
            .with_status(200)
            .with_body("<html>ok</html>")
            .create_async()
            .await;

        let body = fetcher()
            .fetch_text(&format!("{}/articles", server.url()))
            .await
            .unwrap();

        assert_eq!(body, "<html>ok</html>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_text_non_success_is_status_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let err = fetcher()
            .fetch_text(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();

        match err {
            ScrapeError::Status { status, url } => {
                assert_eq!(status.as_u16(), 404);
                assert!(url.ends_with("/missing"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_fetch_error() {
        // Nothing listens on port 9 on a test machine.
        let err = fetcher()
            .fetch_text("http://127.0.0.1:9/")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_download_writes_file_and_creates_dirs() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/img/hero.png")
            .with_status(200)
            .with_body(vec![1u8, 2, 3, 4])
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("training/some-article/hero.png");
        let written = fetcher()
            .download(&format!("{}/img/hero.png", server.url()), &dest)
            .await
            .unwrap();

        assert_eq!(written, 4);
        assert_eq!(std::fs::read(&dest).unwrap(), vec![1u8, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_download_interrupted_mid_stream_removes_partial_file() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/img/cut.jpg")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(b"first chunk of the image")?;
                w.flush()?;
                Err(std::io::Error::other("connection reset"))
            })
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("training/cut-article/image-1.jpg");
        let result = fetcher()
            .download(&format!("{}/img/cut.jpg", server.url()), &dest)
            .await;

        assert!(result.is_err());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_failure_leaves_no_file() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/img/gone.png")
            .with_status(500)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("gone.png");
        let result = fetcher()
            .download(&format!("{}/img/gone.png", server.url()), &dest)
            .await;

        assert!(result.is_err());
        assert!(!dest.exists());
    }
}
