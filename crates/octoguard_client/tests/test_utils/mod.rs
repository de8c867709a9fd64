//! Test utilities for octoguard client tests.
//!
//! Provides a scripted transport and helpers for building clients against it.

#![allow(dead_code)]

use async_trait::async_trait;
use octoguard_client::{
    ApiClient, BackoffConfigBuilder, ClientConfig, PreparedRequest, Transport, TransportResponse,
};
use octoguard_error::{TransportError, TransportErrorKind};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value as JsonValue, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A single scripted transport outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this response
    Respond {
        status: u16,
        headers: HeaderMap,
        body: String,
    },
    /// Fail at the connection level
    Fail(TransportErrorKind),
    /// 200 with the requested URL and method as the body
    Echo,
    /// Never complete
    Hang,
}

impl MockReply {
    /// JSON response with the given status.
    pub fn json(status: u16, body: JsonValue) -> Self {
        MockReply::Respond {
            status,
            headers: HeaderMap::new(),
            body: body.to_string(),
        }
    }

    /// Response with an empty body.
    pub fn empty(status: u16) -> Self {
        MockReply::Respond {
            status,
            headers: HeaderMap::new(),
            body: String::new(),
        }
    }

    /// Attach quota headers; the reset is `reset_in_secs` from now.
    pub fn with_quota(self, remaining: u32, reset_in_secs: i64) -> Self {
        let reset = chrono::Utc::now().timestamp() + reset_in_secs;
        self.with_header("x-ratelimit-remaining", &remaining.to_string())
            .with_header("x-ratelimit-limit", "5000")
            .with_header("x-ratelimit-reset", &reset.to_string())
    }

    /// Attach a header.
    pub fn with_header(self, name: &'static str, value: &str) -> Self {
        match self {
            MockReply::Respond {
                status,
                mut headers,
                body,
            } => {
                headers.insert(
                    HeaderName::from_static(name),
                    HeaderValue::from_str(value).expect("Valid header value"),
                );
                MockReply::Respond {
                    status,
                    headers,
                    body,
                }
            }
            other => other,
        }
    }
}

#[derive(Default)]
struct MockState {
    script: Mutex<VecDeque<MockReply>>,
    fallback: Mutex<Option<MockReply>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<PreparedRequest>>,
}

/// Transport replaying a script of replies, then a fallback.
///
/// Clones share the script and the call log, so a test can keep one handle
/// while the client owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    /// Replay `script` in order.
    pub fn new(script: Vec<MockReply>) -> Self {
        let transport = Self::default();
        *transport.state.script.lock().unwrap() = script.into();
        transport
    }

    /// Reply with `reply` whenever the script is empty.
    pub fn with_fallback(self, reply: MockReply) -> Self {
        *self.state.fallback.lock().unwrap() = Some(reply);
        self
    }

    /// Always reply with `reply`.
    pub fn always(reply: MockReply) -> Self {
        Self::default().with_fallback(reply)
    }

    /// Number of send calls.
    pub fn call_count(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Option<MockReply> {
        let scripted = self.state.script.lock().unwrap().pop_front();
        scripted.or_else(|| self.state.fallback.lock().unwrap().clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<TransportResponse, TransportError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        self.state.requests.lock().unwrap().push(request.clone());

        match self.next_reply() {
            Some(MockReply::Respond {
                status,
                headers,
                body,
            }) => Ok(TransportResponse::new(status, headers, body.into_bytes())),
            Some(MockReply::Fail(kind)) => Err(TransportError::new(kind)),
            Some(MockReply::Echo) => {
                let body = json!({"url": request.url(), "method": request.method().to_string()});
                Ok(TransportResponse::new(
                    200,
                    HeaderMap::new(),
                    body.to_string().into_bytes(),
                ))
            }
            Some(MockReply::Hang) => std::future::pending().await,
            None => Err(TransportError::new(TransportErrorKind::Other(format!(
                "Mock script exhausted at call {}",
                self.call_count()
            )))),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// A token in the classic personal access token format.
pub fn test_token() -> String {
    format!("ghp_{}", "T3st".repeat(9))
}

/// Configuration with millisecond backoff so retry tests stay fast.
pub fn fast_config(retry_attempts: u32) -> ClientConfig {
    backoff_config(retry_attempts, 10, 50)
}

/// Configuration with the given backoff bounds.
pub fn backoff_config(retry_attempts: u32, base_ms: u64, max_ms: u64) -> ClientConfig {
    ClientConfig::builder()
        .base_url("https://api.test")
        .retry_attempts(retry_attempts)
        .backoff(
            BackoffConfigBuilder::default()
                .base_ms(base_ms)
                .max_ms(max_ms)
                .build()
                .expect("Valid backoff config"),
        )
        .build()
        .expect("Valid client config")
}

/// Client over `transport` with [`fast_config`].
pub fn mock_client(transport: &MockTransport, retry_attempts: u32) -> ApiClient {
    client_with_config(transport, fast_config(retry_attempts))
}

/// Client over `transport` with `config`.
pub fn client_with_config(transport: &MockTransport, config: ClientConfig) -> ApiClient {
    ApiClient::builder()
        .config(config)
        .token(test_token())
        .transport(transport.clone())
        .build()
        .expect("Failed to build mock client")
}
