//! Request and response types.

use derive_getters::Getters;
use octoguard_error::{ClientError, ClientErrorKind, ClientResult};
use octoguard_rate_limit::RateLimitUpdate;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// HTTP verbs accepted by the client.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
}

impl HttpMethod {
    /// Only reads are cached.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, HttpMethod::Get)
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

/// How a request interacts with the response cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CacheMode {
    /// Serve from cache when possible, store on success
    #[default]
    Use,
    /// Skip the lookup but store the fresh response
    Refresh,
    /// Neither read nor write the cache
    Bypass,
}

/// Per-request options.
///
/// # Example
///
/// ```
/// use octoguard_client::{CacheMode, RequestOptions};
/// use std::time::Duration;
///
/// let options = RequestOptions::builder()
///     .cache(CacheMode::Refresh)
///     .ttl(Duration::from_secs(60))
///     .build()
///     .unwrap();
/// assert_eq!(*options.cache(), CacheMode::Refresh);
/// ```
#[derive(Debug, Clone, Default, Getters, derive_builder::Builder)]
#[builder(default)]
pub struct RequestOptions {
    /// Cache behavior
    cache: CacheMode,
    /// TTL for the stored response, overriding the cache default
    #[builder(setter(strip_option))]
    ttl: Option<Duration>,
    /// Headers added after the default ones, replacing duplicates
    headers: HeaderMap,
    /// Aborts the request when fired
    #[builder(setter(strip_option))]
    cancel: Option<CancellationToken>,
}

impl RequestOptions {
    /// Builder for request options.
    pub fn builder() -> RequestOptionsBuilder {
        RequestOptionsBuilder::default()
    }

    /// Options with the given cancellation token.
    pub fn cancellable(cancel: CancellationToken) -> Self {
        Self {
            cancel: Some(cancel),
            ..Self::default()
        }
    }

    /// Options with the given cache mode.
    pub fn with_cache_mode(mode: CacheMode) -> Self {
        Self {
            cache: mode,
            ..Self::default()
        }
    }
}

/// A request as the caller describes it.
#[derive(Debug, Clone, Getters)]
pub struct ApiRequest {
    method: HttpMethod,
    path: String,
    payload: Option<JsonValue>,
    options: RequestOptions,
}

impl ApiRequest {
    /// Request without payload and with default options.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            payload: None,
            options: RequestOptions::default(),
        }
    }

    /// GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Attach a JSON payload.
    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Replace the options.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Fully resolved request handed to interceptors and the transport.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct PreparedRequest {
    method: HttpMethod,
    url: String,
    headers: HeaderMap,
    body: Option<JsonValue>,
}

impl PreparedRequest {
    /// Create a prepared request.
    pub fn new(
        method: HttpMethod,
        url: impl Into<String>,
        headers: HeaderMap,
        body: Option<JsonValue>,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            headers,
            body,
        }
    }

    /// Set a header, replacing any existing value.
    #[track_caller]
    pub fn with_header(mut self, name: &str, value: &str) -> ClientResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ClientError::new(ClientErrorKind::Validation(format!("Invalid header name: {}", e)))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ClientError::new(ClientErrorKind::Validation(format!("Invalid header value: {}", e)))
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Mutable access to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Replace the body.
    pub fn with_body(mut self, body: Option<JsonValue>) -> Self {
        self.body = body;
        self
    }
}

/// Raw response as returned by a transport.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct TransportResponse {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TransportResponse {
    /// Create a transport response.
    pub fn new(status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Decoded response returned to callers.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct ApiResponse {
    status: u16,
    headers: HeaderMap,
    /// JSON body; `Null` for empty bodies
    body: JsonValue,
    /// Served from the cache without a network call
    from_cache: bool,
    /// Time spent on the successful attempt
    elapsed: Duration,
    /// Quota report carried by the response
    rate_limit: Option<RateLimitUpdate>,
}

impl ApiResponse {
    /// Decode a successful transport response.
    #[track_caller]
    pub(crate) fn from_transport(
        raw: TransportResponse,
        elapsed: Duration,
        rate_limit: Option<RateLimitUpdate>,
    ) -> ClientResult<Self> {
        let body = decode_body(raw.body())?;
        Ok(Self {
            status: raw.status,
            headers: raw.headers,
            body,
            from_cache: false,
            elapsed,
            rate_limit,
        })
    }

    /// Response served from the cache.
    pub(crate) fn cached(body: JsonValue) -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            body,
            from_cache: true,
            elapsed: Duration::ZERO,
            rate_limit: None,
        }
    }

    /// Deserialize the body into a typed value.
    #[track_caller]
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| ClientError::new(ClientErrorKind::Decode(e.to_string())))
    }

    /// Replace the body.
    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = body;
        self
    }

    /// Take the body.
    pub fn into_body(self) -> JsonValue {
        self.body
    }
}

/// Empty bodies decode to `Null`.
#[track_caller]
fn decode_body(bytes: &[u8]) -> ClientResult<JsonValue> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonValue::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| ClientError::new(ClientErrorKind::Decode(e.to_string())))
}

/// Options for [`batch_request`](crate::ApiClient::batch_request).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, derive_builder::Builder)]
pub struct BatchOptions {
    /// Requests in flight at once
    #[builder(default = "4")]
    concurrency: usize,
    /// Cancel outstanding items after the first failure
    #[builder(default)]
    fail_fast: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            fail_fast: false,
        }
    }
}

impl BatchOptions {
    /// Builder for batch options.
    pub fn builder() -> BatchOptionsBuilder {
        BatchOptionsBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_method_parsing() {
        assert_eq!(HttpMethod::from_str("get").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::from_str("PATCH").unwrap(), HttpMethod::Patch);
        assert!(HttpMethod::from_str("TRACE").is_err());
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_only_get_cacheable() {
        assert!(HttpMethod::Get.is_cacheable());
        assert!(!HttpMethod::Post.is_cacheable());
        assert!(!HttpMethod::Head.is_cacheable());
    }

    #[test]
    fn test_empty_body_is_null() {
        assert_eq!(decode_body(b"").unwrap(), JsonValue::Null);
        assert_eq!(decode_body(b"  \n").unwrap(), JsonValue::Null);
        assert_eq!(decode_body(br#"{"id":1}"#).unwrap(), json!({"id": 1}));
    }

    #[test]
    fn test_invalid_body_is_decode_error() {
        let err = decode_body(b"<html>").unwrap_err();
        assert!(matches!(err.kind(), ClientErrorKind::Decode(_)));
    }

    #[test]
    fn test_typed_json() {
        #[derive(serde::Deserialize)]
        struct Repo {
            id: u64,
        }
        let response = ApiResponse::cached(json!({"id": 7}));
        let repo: Repo = response.json().unwrap();
        assert_eq!(repo.id, 7);
        assert!(*response.from_cache());
    }

    #[test]
    fn test_prepared_header_override() {
        let prepared = PreparedRequest::new(HttpMethod::Get, "https://x", HeaderMap::new(), None)
            .with_header("x-trace", "1")
            .unwrap()
            .with_header("x-trace", "2")
            .unwrap();
        assert_eq!(prepared.headers()["x-trace"], "2");
        assert!(
            PreparedRequest::new(HttpMethod::Get, "https://x", HeaderMap::new(), None)
                .with_header("bad header", "v")
                .is_err()
        );
    }

    #[test]
    fn test_batch_defaults() {
        let options = BatchOptions::builder().build().unwrap();
        assert_eq!(options, BatchOptions::default());
    }
}
