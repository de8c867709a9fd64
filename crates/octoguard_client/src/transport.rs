//! HTTP transport abstraction.

use crate::{PreparedRequest, TransportResponse};
use async_trait::async_trait;
use octoguard_error::{ClientError, ClientErrorKind, ClientResult, TransportError, TransportErrorKind};
use std::time::Duration;
use tracing::{debug, instrument};

/// Sends one prepared request and returns the raw response.
///
/// Implementations perform exactly one network exchange per call. Retries,
/// rate limiting and caching belong to the client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request.
    async fn send(&self, request: &PreparedRequest) -> Result<TransportResponse, TransportError>;

    /// Transport name for logs.
    fn name(&self) -> &'static str;
}

/// Default transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a per-request timeout.
    #[track_caller]
    pub fn new(timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ClientError::new(ClientErrorKind::InvalidConfig(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    async fn send(&self, request: &PreparedRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method().to_reqwest(), request.url().as_str())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        debug!(status, bytes = body.len(), "Received response");
        Ok(TransportResponse::new(status, headers, body.to_vec()))
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    let message = err.to_string();
    let kind = if err.is_builder() {
        TransportErrorKind::Other(message)
    } else if err.is_timeout() {
        TransportErrorKind::Timeout(message)
    } else if err.is_connect() {
        TransportErrorKind::Connect(message)
    } else if err.is_body() || err.is_decode() {
        TransportErrorKind::Body(message)
    } else if err.is_request() {
        TransportErrorKind::Reset(message)
    } else {
        TransportErrorKind::Other(message)
    };
    TransportError::new(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpMethod;
    use octoguard_error::ErrorCategory;
    use reqwest::header::HeaderMap;

    #[tokio::test]
    async fn test_connection_refused_is_network() {
        let transport = ReqwestTransport::new(Duration::from_secs(2)).unwrap();
        let request = PreparedRequest::new(
            HttpMethod::Get,
            "http://127.0.0.1:9/unreachable",
            HeaderMap::new(),
            None,
        );
        let err = transport.send(&request).await.unwrap_err();
        let classification = err.classification();
        assert_eq!(classification.kind, ErrorCategory::Network);
        assert!(classification.retryable);
    }

    #[tokio::test]
    async fn test_malformed_url_not_retryable() {
        let transport = ReqwestTransport::new(Duration::from_secs(2)).unwrap();
        let request = PreparedRequest::new(HttpMethod::Get, "not a url", HeaderMap::new(), None);
        let err = transport.send(&request).await.unwrap_err();
        assert!(!err.classification().retryable);
    }
}
