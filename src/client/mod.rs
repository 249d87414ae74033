//! Async FicHub client with a bounded number of in-flight requests.

mod error;
mod transport;

pub use error::{ClientError, TransportError};
pub use transport::{HttpTransport, Transport};

use crate::model::{Story, StoryDownloadBundle};
use crate::shape::{parse_story_download_with, parse_story_metadata_with, DescriptionFormat};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub const FICHUB_API_BASE: &str = "https://fichub.net/api/v0";
const DEFAULT_USER_AGENT: &str = concat!("fichub-rs/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// FicHub asks clients to keep between one and three requests in flight.
pub const CONCURRENCY_RANGE: RangeInclusive<usize> = 1..=3;
pub const DEFAULT_CONCURRENCY: usize = 2;

/// FicHub API client. Cloning is cheap and clones share the request limit.
#[derive(Debug)]
pub struct FicHubClient<T = HttpTransport> {
    transport: Arc<T>,
    limiter: Arc<Semaphore>,
    concurrency: usize,
    description: DescriptionFormat,
}

impl<T> Clone for FicHubClient<T> {
    fn clone(&self) -> Self {
        FicHubClient {
            transport: Arc::clone(&self.transport),
            limiter: Arc::clone(&self.limiter),
            concurrency: self.concurrency,
            description: self.description,
        }
    }
}

impl FicHubClient<HttpTransport> {
    /// Client with the default User-Agent, timeout, and a limit of two requests.
    pub fn new() -> Result<Self, ClientError> {
        Self::builder().build()
    }

    pub fn builder() -> FicHubClientBuilder {
        FicHubClientBuilder::default()
    }
}

impl<T: Transport> FicHubClient<T> {
    /// Maximum number of simultaneous requests.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn get(&self, endpoint: &str, url: &str) -> Result<Vec<u8>, ClientError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ClientError::LimiterClosed)?;
        Ok(self.transport.get(endpoint, &[("q", url)]).await?)
    }

    /// Look up a story's metadata.
    #[tracing::instrument(skip(self), err)]
    pub async fn get_story_metadata(&self, url: &str) -> Result<Story, ClientError> {
        let body = self.get("/meta", url).await?;
        parse_story_metadata_with(&body, self.description).map_err(|source| {
            ClientError::Metadata {
                url: url.to_string(),
                source,
            }
        })
    }

    /// Look up download links (epub, html, mobi, pdf) for a story, plus its metadata when
    /// FicHub's embedded copy can be parsed.
    #[tracing::instrument(skip(self), err)]
    pub async fn get_download_urls(&self, url: &str) -> Result<StoryDownloadBundle, ClientError> {
        let body = self.get("/epub", url).await?;
        parse_story_download_with(&body, self.description).map_err(|source| {
            ClientError::Download {
                url: url.to_string(),
                source,
            }
        })
    }
}

/// Builder for [FicHubClient].
#[derive(Debug)]
pub struct FicHubClientBuilder {
    user_agent: Option<String>,
    base_url: String,
    timeout_secs: u64,
    concurrency: usize,
    description: DescriptionFormat,
}

impl Default for FicHubClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            base_url: FICHUB_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            description: DescriptionFormat::Markdown,
        }
    }
}

impl FicHubClientBuilder {
    /// Set a custom User-Agent. Defaults to `fichub-rs/<version>`.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Override the API base, e.g. for a mirror. Default `https://fichub.net/api/v0`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Maximum simultaneous requests. Must be within [CONCURRENCY_RANGE]; checked by `build`.
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit;
        self
    }

    /// How story descriptions are returned. Default Markdown.
    pub fn description(mut self, format: DescriptionFormat) -> Self {
        self.description = format;
        self
    }

    /// Build a client on the reqwest transport.
    pub fn build(self) -> Result<FicHubClient<HttpTransport>, ClientError> {
        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let transport = HttpTransport::new(
            self.base_url.clone(),
            &user_agent,
            Duration::from_secs(self.timeout_secs),
        )
        .map_err(|source| ClientError::Build { source })?;
        self.build_with_transport(transport)
    }

    /// Build a client on any [Transport]. User-Agent, base URL, and timeout are the
    /// transport's business and are ignored here.
    pub fn build_with_transport<T: Transport>(
        self,
        transport: T,
    ) -> Result<FicHubClient<T>, ClientError> {
        validate_concurrency(self.concurrency)?;
        Ok(FicHubClient {
            transport: Arc::new(transport),
            limiter: Arc::new(Semaphore::new(self.concurrency)),
            concurrency: self.concurrency,
            description: self.description,
        })
    }
}

/// Reject limits outside [CONCURRENCY_RANGE] instead of clamping them.
pub fn validate_concurrency(limit: usize) -> Result<usize, ClientError> {
    if CONCURRENCY_RANGE.contains(&limit) {
        Ok(limit)
    } else {
        Err(ClientError::InvalidConcurrency {
            value: limit,
            min: *CONCURRENCY_RANGE.start(),
            max: *CONCURRENCY_RANGE.end(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{ShapeError, SiteKind};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory transport: canned bodies per endpoint, records calls and peak parallelism.
    #[derive(Default)]
    struct FakeTransport {
        bodies: HashMap<&'static str, Result<Vec<u8>, u16>>,
        calls: Mutex<Vec<(String, String)>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        delay_ms: u64,
    }

    impl FakeTransport {
        fn with_body(mut self, endpoint: &'static str, body: Value) -> Self {
            self.bodies
                .insert(endpoint, Ok(body.to_string().into_bytes()));
            self
        }

        fn with_status(mut self, endpoint: &'static str, status: u16) -> Self {
            self.bodies.insert(endpoint, Err(status));
            self
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get(
            &self,
            endpoint: &str,
            query: &[(&str, &str)],
        ) -> Result<Vec<u8>, TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let q = query
                .iter()
                .find(|(k, _)| *k == "q")
                .map(|(_, v)| v.to_string())
                .unwrap_or_default();
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), q));
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match self.bodies.get(endpoint) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(status)) => Err(TransportError::HttpStatus {
                    status: *status,
                    url: endpoint.to_string(),
                    message: "fake".to_string(),
                }),
                None => Err(TransportError::HttpStatus {
                    status: 404,
                    url: endpoint.to_string(),
                    message: "Not Found".to_string(),
                }),
            }
        }
    }

    fn ffn_meta() -> Value {
        json!({
            "author": "Writer",
            "authorId": 5,
            "authorLocalId": "55",
            "authorUrl": "https://www.fanfiction.net/u/55/Writer",
            "chapters": 2,
            "created": "2022-01-01T00:00:00",
            "description": "<p>Two <strong>chapters</strong>.</p>",
            "rawExtendedMeta": {
                "characters": "[A, B]",
                "rated": "Fiction K",
                "raw_fandom": "Naruto",
            },
            "source": "https://www.fanfiction.net/s/14295079/1/",
            "status": "ongoing",
            "title": "Short",
            "updated": "2022-02-01T00:00:00",
            "words": 3000,
        })
    }

    #[test]
    fn concurrency_outside_range_is_rejected() {
        for bad in [0, 4, 100] {
            match validate_concurrency(bad) {
                Err(ClientError::InvalidConcurrency { value, min, max }) => {
                    assert_eq!(value, bad);
                    assert_eq!((min, max), (1, 3));
                }
                other => panic!("expected InvalidConcurrency, got {:?}", other),
            }
        }
        for good in 1..=3 {
            assert_eq!(validate_concurrency(good).unwrap(), good);
        }
    }

    #[test]
    fn builder_rejects_bad_concurrency() {
        let result = FicHubClient::builder()
            .concurrency(4)
            .build_with_transport(FakeTransport::default());
        assert!(matches!(
            result,
            Err(ClientError::InvalidConcurrency { value: 4, .. })
        ));
    }

    #[test]
    fn builder_defaults() -> Result<(), ClientError> {
        let client = FicHubClient::builder().build_with_transport(FakeTransport::default())?;
        assert_eq!(client.concurrency(), DEFAULT_CONCURRENCY);
        Ok(())
    }

    #[tokio::test]
    async fn metadata_request_uses_meta_endpoint() -> Result<(), ClientError> {
        let client = FicHubClient::builder()
            .build_with_transport(FakeTransport::default().with_body("/meta", ffn_meta()))?;
        let story = client
            .get_story_metadata("https://www.fanfiction.net/s/14295079/1/")
            .await?;
        assert_eq!(story.site(), SiteKind::Ffn);
        assert_eq!(story.description(), "Two **chapters**.");
        let calls = client.transport().calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![(
                "/meta".to_string(),
                "https://www.fanfiction.net/s/14295079/1/".to_string()
            )]
        );
        Ok(())
    }

    #[tokio::test]
    async fn raw_description_is_kept_when_requested() -> Result<(), ClientError> {
        let client = FicHubClient::builder()
            .description(DescriptionFormat::Raw)
            .build_with_transport(FakeTransport::default().with_body("/meta", ffn_meta()))?;
        let story = client.get_story_metadata("x").await?;
        assert_eq!(story.description(), "<p>Two <strong>chapters</strong>.</p>");
        Ok(())
    }

    #[tokio::test]
    async fn http_failure_surfaces_as_transport_error() -> Result<(), ClientError> {
        let client = FicHubClient::builder()
            .build_with_transport(FakeTransport::default().with_status("/meta", 503))?;
        match client.get_story_metadata("x").await {
            Err(ClientError::Transport(TransportError::HttpStatus { status, .. })) => {
                assert_eq!(status, 503)
            }
            other => panic!("expected HttpStatus, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn shaping_failure_is_wrapped_with_url() -> Result<(), ClientError> {
        let client = FicHubClient::builder().build_with_transport(
            FakeTransport::default().with_body("/meta", json!({"title": "no source"})),
        )?;
        let err = client
            .get_story_metadata("https://example.com/s/1")
            .await
            .expect_err("payload without source must fail");
        match &err {
            ClientError::Metadata { url, .. } => assert_eq!(url, "https://example.com/s/1"),
            other => panic!("expected Metadata error, got {:?}", other),
        }
        assert!(matches!(
            err.shape_error(),
            Some(ShapeError::Shaping { key, .. }) if key == "source"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn download_request_degrades_bad_metadata() -> Result<(), ClientError> {
        let body = json!({
            "meta": {"source": "https://www.fanfiction.net/s/1/1/"},
            "urls": {
                "epub": "/cache/epub/1.epub",
                "html": "/cache/html/1.zip",
                "mobi": "/cache/mobi/1.mobi",
                "pdf": "/cache/pdf/1.pdf",
            },
        });
        let client = FicHubClient::builder()
            .build_with_transport(FakeTransport::default().with_body("/epub", body))?;
        let bundle = client
            .get_download_urls("https://www.fanfiction.net/s/1/1/")
            .await?;
        assert!(bundle.metadata.is_none());
        assert_eq!(bundle.links.html, "https://fichub.net/cache/html/1.zip");
        Ok(())
    }

    #[tokio::test]
    async fn in_flight_requests_never_exceed_limit() -> Result<(), ClientError> {
        let transport = FakeTransport {
            delay_ms: 20,
            ..FakeTransport::default()
        }
        .with_body("/meta", ffn_meta());
        let client = FicHubClient::builder()
            .concurrency(2)
            .build_with_transport(transport)?;

        let lookups = (0..8).map(|_| client.get_story_metadata("x"));
        let results = futures::future::join_all(lookups).await;
        assert!(results.iter().all(Result::is_ok));

        let transport = client.transport();
        assert_eq!(transport.calls.lock().unwrap().len(), 8);
        assert!(transport.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(transport.in_flight.load(Ordering::SeqCst), 0);
        Ok(())
    }
}
