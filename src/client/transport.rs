//! The HTTP seam. [HttpTransport] talks to FicHub over reqwest; tests swap in a fake.

use crate::client::error::TransportError;
use async_trait::async_trait;
use std::time::Duration;

/// Fetches raw response bodies. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `endpoint` (relative to the API base) with the given query parameters.
    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Vec<u8>, TransportError>;
}

/// reqwest-backed transport with a fixed base URL, User-Agent, and timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(HttpTransport {
            inner,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Vec<u8>, TransportError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%url, ?query, "sending request");
        let response = self
            .inner
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| TransportError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                url,
                message: status.canonical_reason().unwrap_or("unknown status").to_string(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| TransportError::BodyRead {
                url: url.clone(),
                source,
            })?;
        tracing::debug!(%url, bytes = body.len(), "response received");
        Ok(body.to_vec())
    }
}
