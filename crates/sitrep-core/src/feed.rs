//! Feed retrieval with a hard deadline.
//!
//! The fetcher races the underlying retrieval against a 90 second
//! deadline. The race uses `tokio::time::timeout`, so the losing future is
//! dropped and its work actually cancelled, rather than left running with
//! its result ignored.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::EngineError;

/// Deadline for one feed download.
pub const FEED_TIMEOUT: Duration = Duration::from_secs(90);

/// Bodies shorter than this are treated as "no usable fresh data".
pub const MIN_FEED_LEN: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("feed endpoint returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Transport seam for the raw feed. The cache buster must vary per call;
/// implementations fold it into the request so no cache along the path can
/// serve a stale body.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_raw(&self, cache_buster: &str) -> Result<String, FeedError>;
}

/// HTTP CSV feed at a fixed base URL, cache-busted via a `t` query param.
pub struct HttpFeedSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFeedSource {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("sitrep/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url,
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_raw(&self, cache_buster: &str) -> Result<String, FeedError> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("t", cache_buster);

        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(FeedError::Status(resp.status()));
        }
        Ok(resp.text().await?)
    }
}

/// Applies the deadline and the minimum-length validity check on top of a
/// [`FeedSource`].
pub struct FeedFetcher {
    source: Arc<dyn FeedSource>,
    timeout: Duration,
}

impl FeedFetcher {
    pub fn new(source: Arc<dyn FeedSource>) -> Self {
        Self {
            source,
            timeout: FEED_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeout(source: Arc<dyn FeedSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Fetch the feed body for this scan.
    ///
    /// Errors: [`EngineError::FetchTimeout`] when the deadline wins,
    /// [`EngineError::FeedRequest`] on transport failure,
    /// [`EngineError::InvalidFeed`] when the body is too short to be real
    /// data.
    pub async fn fetch(&self, cache_buster: &str) -> Result<String, EngineError> {
        let body = tokio::time::timeout(self.timeout, self.source.fetch_raw(cache_buster))
            .await
            .map_err(|_| EngineError::FetchTimeout)?
            .map_err(|e| match e {
                FeedError::Network(e) => EngineError::FeedRequest(e),
                FeedError::Status(_) => EngineError::InvalidFeed,
            })?;

        if body.len() < MIN_FEED_LEN {
            return Err(EngineError::InvalidFeed);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFeed(String);

    #[async_trait]
    impl FeedSource for StaticFeed {
        async fn fetch_raw(&self, _cache_buster: &str) -> Result<String, FeedError> {
            Ok(self.0.clone())
        }
    }

    struct NeverSettles;

    #[async_trait]
    impl FeedSource for NeverSettles {
        async fn fetch_raw(&self, _cache_buster: &str) -> Result<String, FeedError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn accepts_a_plausible_body() {
        let body = "date,title,link\n".repeat(10);
        let fetcher = FeedFetcher::new(Arc::new(StaticFeed(body.clone())));
        assert_eq!(fetcher.fetch("1").await.unwrap(), body);
    }

    #[tokio::test]
    async fn short_body_is_invalid() {
        let fetcher = FeedFetcher::new(Arc::new(StaticFeed("too short".into())));
        let err = fetcher.fetch("1").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidFeed));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_wins_over_a_hung_source() {
        let fetcher =
            FeedFetcher::with_timeout(Arc::new(NeverSettles), Duration::from_millis(50));
        let err = fetcher.fetch("1").await.unwrap_err();
        assert!(matches!(err, EngineError::FetchTimeout));
    }

    #[tokio::test]
    async fn http_source_appends_cache_buster() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/feed.csv")
            .match_query(mockito::Matcher::UrlEncoded("t".into(), "1700000000".into()))
            .with_status(200)
            .with_body("date,title,link\n".repeat(10))
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/feed.csv", server.url())).unwrap();
        let source = HttpFeedSource::new(url);
        let body = source.fetch_raw("1700000000").await.unwrap();
        assert!(body.len() >= MIN_FEED_LEN);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_source_rejects_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/feed.csv")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/feed.csv", server.url())).unwrap();
        let source = HttpFeedSource::new(url);
        let err = source.fetch_raw("1").await.unwrap_err();
        assert!(matches!(err, FeedError::Status(s) if s.as_u16() == 500));
    }
}
