//! The API client: cache, rate limiter, retries and metrics around a transport.

use crate::{
    ApiRequest, ApiResponse, BatchOptions, CacheMode, ClientConfig, Credential, HealthReport,
    HttpMethod, PreparedRequest, ReqwestTransport, RequestInterceptor, RequestOptions,
    ResponseInterceptor, Transport,
};
use futures::stream::{self, StreamExt};
use octoguard_cache::{RequestCache, cache_key};
use octoguard_error::{
    ClientError, ClientErrorKind, ClientResult, ErrorClassification, RetryableError,
};
use octoguard_metrics::{MetricsCollector, MetricsSnapshot};
use octoguard_rate_limit::{RateLimitStatus, RateLimitUpdate, RateLimiter, parse_retry_after};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio_retry2::{Retry, RetryError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

const GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";

/// Rate-limited, caching, retrying client for a REST API.
///
/// Cheap to clone; clones share the cache, limiter, metrics and shutdown
/// state.
///
/// # Example
///
/// ```rust,ignore
/// let client = ApiClient::builder()
///     .token(std::env::var("GITHUB_TOKEN")?)
///     .build()?;
///
/// let repo = client.get("/repos/rust-lang/rust").await?;
/// println!("{}", repo.body()["full_name"]);
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    credential: Credential,
    default_headers: HeaderMap,
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    cache: RequestCache,
    metrics: MetricsCollector,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    shutdown: CancellationToken,
}

impl ApiClient {
    /// Client with the default transport and its own rate limiter.
    #[track_caller]
    pub fn new(config: ClientConfig, token: impl Into<String>) -> ClientResult<Self> {
        Self::builder().config(config).token(token).build()
    }

    /// Builder for a client.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Credential the client authenticates with.
    pub fn credential(&self) -> &Credential {
        &self.inner.credential
    }

    /// Rate limiter gating this client, possibly shared with others.
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.limiter
    }

    /// Response cache.
    pub fn cache(&self) -> &RequestCache {
        &self.inner.cache
    }

    /// Issue one request.
    ///
    /// GET responses are served from and stored in the cache according to
    /// `options`. Every network attempt waits for the rate limiter first.
    /// Transient failures are retried up to `retry_attempts` attempts in
    /// total. `payload` is cloned and never modified.
    #[instrument(skip(self, payload, options), fields(method = %method, path = %path))]
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Option<&JsonValue>,
        options: RequestOptions,
    ) -> ClientResult<ApiResponse> {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            return Err(ClientError::new(ClientErrorKind::Shutdown));
        }
        validate_path(path)?;

        let mode = *options.cache();
        let key = (method.is_cacheable() && mode != CacheMode::Bypass)
            .then(|| cache_key(method.as_ref(), path, payload));

        if let Some(key) = &key {
            if mode == CacheMode::Use {
                if let Some(value) = inner.cache.get(key) {
                    inner.metrics.record_cache_hit();
                    debug!("Served from cache");
                    return Ok(self.intercept_response(ApiResponse::cached(value)));
                }
                inner.metrics.record_cache_miss();
            }
        }

        let prepared = self.prepare(method, path, payload, options.headers());
        let cancel = options.cancel().clone().unwrap_or_else(CancellationToken::new);

        let result = tokio::select! {
            biased;
            _ = inner.shutdown.cancelled() => Err(ClientError::new(ClientErrorKind::Shutdown)),
            _ = cancel.cancelled() => {
                debug!("Request cancelled by caller");
                Err(ClientError::new(ClientErrorKind::Cancelled))
            }
            result = self.send_with_retry(&prepared) => result,
        };

        let response = result?;
        if let Some(key) = &key {
            match options.ttl() {
                Some(ttl) => inner.cache.set_with_ttl(key, response.body(), *ttl),
                None => inner.cache.set(key, response.body()),
            }
        }
        Ok(self.intercept_response(response))
    }

    /// Issue a described request.
    pub async fn execute(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        self.request(
            *request.method(),
            request.path(),
            request.payload().as_ref(),
            request.options().clone(),
        )
        .await
    }

    /// GET `path` with default options.
    pub async fn get(&self, path: &str) -> ClientResult<ApiResponse> {
        self.request(HttpMethod::Get, path, None, RequestOptions::default())
            .await
    }

    /// POST `payload` to `path`.
    pub async fn post(&self, path: &str, payload: &JsonValue) -> ClientResult<ApiResponse> {
        self.request(HttpMethod::Post, path, Some(payload), RequestOptions::default())
            .await
    }

    /// PUT `payload` to `path`.
    pub async fn put(&self, path: &str, payload: &JsonValue) -> ClientResult<ApiResponse> {
        self.request(HttpMethod::Put, path, Some(payload), RequestOptions::default())
            .await
    }

    /// PATCH `path` with `payload`.
    pub async fn patch(&self, path: &str, payload: &JsonValue) -> ClientResult<ApiResponse> {
        self.request(HttpMethod::Patch, path, Some(payload), RequestOptions::default())
            .await
    }

    /// DELETE `path`.
    pub async fn delete(&self, path: &str) -> ClientResult<ApiResponse> {
        self.request(HttpMethod::Delete, path, None, RequestOptions::default())
            .await
    }

    /// Issue many requests with bounded concurrency.
    ///
    /// Results come back in input order. Every item still goes through the
    /// cache and the rate limiter. With `fail_fast`, the first failure cancels
    /// the items still pending or in flight; they report `Cancelled`.
    #[instrument(skip(self, requests), fields(count = requests.len(), concurrency = options.concurrency(), fail_fast = options.fail_fast()))]
    pub async fn batch_request(
        &self,
        requests: Vec<ApiRequest>,
        options: BatchOptions,
    ) -> Vec<ClientResult<ApiResponse>> {
        let abort = CancellationToken::new();
        let abort = &abort;
        let fail_fast = *options.fail_fast();

        let results: Vec<ClientResult<ApiResponse>> = stream::iter(requests)
            .map(move |request| async move {
                if abort.is_cancelled() {
                    return Err(ClientError::new(ClientErrorKind::Cancelled));
                }
                let result = tokio::select! {
                    biased;
                    _ = abort.cancelled() => Err(ClientError::new(ClientErrorKind::Cancelled)),
                    result = self.execute(&request) => result,
                };
                if fail_fast && result.is_err() && !abort.is_cancelled() {
                    warn!(path = %request.path(), "Batch item failed, cancelling the rest");
                    abort.cancel();
                }
                result
            })
            .buffered((*options.concurrency()).max(1))
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        debug!(failed, "Batch complete");
        results
    }

    /// Remove cached responses whose key matches `pattern` (a regex over
    /// `"METHOD path [payload]"`). Returns how many were removed.
    pub fn invalidate(&self, pattern: &str) -> ClientResult<usize> {
        Ok(self.inner.cache.invalidate(pattern)?)
    }

    /// Current rate limiter state.
    pub fn rate_limit_status(&self) -> RateLimitStatus {
        self.inner.limiter.status()
    }

    /// Current metrics.
    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Health score with limiter and cache state.
    pub fn health(&self) -> HealthReport {
        let inner = &self.inner;
        HealthReport::new(
            &inner.metrics.snapshot(),
            inner.limiter.status(),
            inner.cache.stats(),
            inner.shutdown.is_cancelled(),
        )
    }

    /// Clear the cache and metrics and restore the local rate budget.
    #[instrument(skip(self))]
    pub fn reset(&self) {
        self.inner.cache.reset();
        self.inner.metrics.reset();
        self.inner.limiter.reset();
        info!("Client state reset");
    }

    /// Cancel in-flight requests, clear the cache and refuse further requests.
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.cache.clear();
        info!("Client shut down");
    }

    /// True once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    fn prepare(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Option<&JsonValue>,
        extra_headers: &HeaderMap,
    ) -> PreparedRequest {
        let inner = &self.inner;
        let mut headers = inner.default_headers.clone();
        for (name, value) in extra_headers {
            headers.insert(name.clone(), value.clone());
        }
        let url = format!("{}{}", inner.config.base_url().trim_end_matches('/'), path);
        let prepared = PreparedRequest::new(method, url, headers, payload.cloned());
        inner
            .request_interceptors
            .iter()
            .fold(prepared, |request, interceptor| interceptor.intercept(request))
    }

    fn intercept_response(&self, response: ApiResponse) -> ApiResponse {
        self.inner
            .response_interceptors
            .iter()
            .fold(response, |response, interceptor| interceptor.intercept(response))
    }

    /// Run the retry loop.
    ///
    /// The sleep before each retry is the jittered backoff, unless the failed
    /// attempt left a server-mandated delay in `server_delay`, which replaces
    /// it.
    async fn send_with_retry(&self, prepared: &PreparedRequest) -> ClientResult<ApiResponse> {
        let max_attempts = *self.inner.config.retry_attempts();
        let server_delay = ServerDelay::new();
        let server_delay = &server_delay;
        let strategy = self
            .inner
            .config
            .backoff()
            .strategy()
            .take(max_attempts.saturating_sub(1) as usize)
            .map(move |backoff| server_delay.take().unwrap_or(backoff));

        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let result = Retry::spawn(strategy, move || {
            self.attempt(prepared, attempts, server_delay)
        })
        .await;

        result.map_err(|err| {
            let made = attempts.load(Ordering::Relaxed);
            if !err.is_retryable() {
                error!(attempts = made, error = %err, "Request failed");
                return err;
            }
            let (last, message) = match err.kind() {
                ClientErrorKind::Transient {
                    classification,
                    message,
                } => (*classification, message.clone()),
                _ => (ErrorClassification::unknown(), err.to_string()),
            };
            error!(attempts = made, last = %last, "Retries exhausted");
            ClientError::new(ClientErrorKind::ExhaustedRetries {
                attempts: made,
                last,
                message,
            })
        })
    }

    /// One network attempt: limiter, transport, bookkeeping, classification.
    async fn attempt(
        &self,
        prepared: &PreparedRequest,
        attempts: &AtomicU32,
        server_delay: &ServerDelay,
    ) -> Result<ApiResponse, RetryError<ClientError>> {
        let inner = &self.inner;
        let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
        if attempt > 1 {
            inner.metrics.record_retry();
        }

        let waited = inner.limiter.wait_for_token().await;
        if waited >= Duration::from_millis(1) {
            inner.metrics.record_rate_limit_delay(waited);
        }

        let method = prepared.method().as_ref();
        inner.metrics.record_request(method);
        let started = Instant::now();
        let outcome = inner.transport.send(prepared).await;
        let elapsed = started.elapsed();

        let raw = match outcome {
            Ok(raw) => raw,
            Err(e) => {
                let err = ClientError::from_transport(&e);
                inner.metrics.record_error(&e.classification());
                return Err(self.to_retry_error(err, attempt, None));
            }
        };

        let status = *raw.status();
        inner.metrics.record_response(method, status, elapsed);
        let update = inner.limiter.update_from_headers(raw.headers());

        if raw.is_success() {
            return ApiResponse::from_transport(raw, elapsed, update).map_err(|err| {
                inner.metrics.record_error(&ErrorClassification::unknown());
                RetryError::Permanent(err)
            });
        }

        let quota_exhausted = update.as_ref().is_some_and(|u| *u.remaining() == 0);
        let classification = ErrorClassification::from_status(status, quota_exhausted);
        inner.metrics.record_error(&classification);

        let message = raw.text();
        let err = if classification.retryable {
            ClientError::new(ClientErrorKind::Transient {
                classification,
                message,
            })
        } else {
            ClientError::new(ClientErrorKind::RequestFailed {
                classification,
                message,
            })
        };
        let retry_after = self.rate_limit_delay(&classification, raw.headers(), update.as_ref());
        if let Some(delay) = retry_after {
            server_delay.set(delay);
        }
        Err(self.to_retry_error(err, attempt, retry_after))
    }

    /// Delay that replaces the backoff before the next attempt.
    ///
    /// `Retry-After` wins, capped at `max_reset_wait`. An exhausted quota with
    /// a reset time needs no extra delay since the limiter already holds the
    /// next attempt until the reset.
    fn rate_limit_delay(
        &self,
        classification: &ErrorClassification,
        headers: &HeaderMap,
        update: Option<&RateLimitUpdate>,
    ) -> Option<Duration> {
        if let Some(delay) = parse_retry_after(headers) {
            return Some(delay.min(self.inner.limiter.config().max_reset_wait()));
        }
        if !classification.is_rate_limit() {
            return None;
        }
        update
            .filter(|u| *u.remaining() == 0 && u.reset_at().is_some())
            .map(|_| Duration::ZERO)
    }

    fn to_retry_error(
        &self,
        err: ClientError,
        attempt: u32,
        retry_after: Option<Duration>,
    ) -> RetryError<ClientError> {
        if err.is_retryable() {
            warn!(attempt, error = %err, retry_after = ?retry_after, "Transient failure");
            RetryError::Transient { err, retry_after }
        } else {
            RetryError::Permanent(err)
        }
    }
}

/// Per-request slot for a delay requested by the server.
///
/// Written by a failed attempt, consumed by the retry strategy when it picks
/// the next sleep.
struct ServerDelay(AtomicU64);

impl ServerDelay {
    const EMPTY: u64 = u64::MAX;

    fn new() -> Self {
        Self(AtomicU64::new(Self::EMPTY))
    }

    fn set(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(Self::EMPTY - 1);
        self.0.store(millis.min(Self::EMPTY - 1), Ordering::Relaxed);
    }

    fn take(&self) -> Option<Duration> {
        let millis = self.0.swap(Self::EMPTY, Ordering::Relaxed);
        (millis != Self::EMPTY).then(|| Duration::from_millis(millis))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", self.inner.config.base_url())
            .field("credential", &self.inner.credential)
            .field("transport", &self.inner.transport.name())
            .field("shut_down", &self.inner.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[track_caller]
fn validate_path(path: &str) -> ClientResult<()> {
    let invalid = |reason: &str| {
        ClientError::new(ClientErrorKind::Validation(format!(
            "Invalid path '{}': {}",
            path, reason
        )))
    };
    if !path.starts_with('/') || path.starts_with("//") {
        return Err(invalid("must be relative and start with a single '/'"));
    }
    if path.contains("://") {
        return Err(invalid("must not contain a scheme"));
    }
    if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("must not contain whitespace"));
    }
    Ok(())
}

/// Builder for [`ApiClient`].
///
/// A token is required. Everything else defaults: the configuration, a
/// `reqwest` transport, and a rate limiter owned by the client.
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    token: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    rate_limiter: Option<Arc<RateLimiter>>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl ApiClientBuilder {
    /// Client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// API token, validated on [`build`](Self::build).
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Replace the HTTP transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use a transport shared with other clients.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share a rate limiter with other clients using the same credential.
    ///
    /// The limiter's own configuration takes precedence over `rate_limit` in
    /// the client configuration.
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Append a request interceptor.
    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.request_interceptors.push(Arc::new(interceptor));
        self
    }

    /// Append a response interceptor.
    pub fn response_interceptor(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.response_interceptors.push(Arc::new(interceptor));
        self
    }

    /// Validate everything and build the client.
    #[track_caller]
    pub fn build(self) -> ClientResult<ApiClient> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let token = self.token.ok_or_else(|| {
            ClientError::new(ClientErrorKind::InvalidCredential("no token provided".to_string()))
        })?;
        let credential = Credential::new(token)?;
        let default_headers = default_headers(&config, &credential)?;

        let limiter = match self.rate_limiter {
            Some(limiter) => limiter,
            None => Arc::new(RateLimiter::new(config.rate_limit().clone()).map_err(|e| {
                ClientError::new(ClientErrorKind::InvalidConfig(e.to_string()))
            })?),
        };
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(config.timeout())?),
        };

        info!(
            base_url = %config.base_url(),
            credential = %credential,
            transport = transport.name(),
            retry_attempts = config.retry_attempts(),
            "Creating API client"
        );

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                cache: RequestCache::new(config.cache().clone()),
                metrics: MetricsCollector::new(),
                config,
                credential,
                default_headers,
                transport,
                limiter,
                request_interceptors: self.request_interceptors,
                response_interceptors: self.response_interceptors,
                shutdown: CancellationToken::new(),
            }),
        })
    }
}

#[track_caller]
fn default_headers(config: &ClientConfig, credential: &Credential) -> ClientResult<HeaderMap> {
    let invalid = |what: &str| {
        ClientError::new(ClientErrorKind::InvalidConfig(format!(
            "{} is not a valid header value",
            what
        )))
    };

    let mut authorization =
        HeaderValue::from_str(&credential.bearer()).map_err(|_| invalid("credential"))?;
    authorization.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, authorization);
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(config.user_agent()).map_err(|_| invalid("user_agent"))?,
    );
    headers.insert(
        HeaderName::from_static(API_VERSION_HEADER),
        HeaderValue::from_str(config.api_version()).map_err(|_| invalid("api_version"))?,
    );
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_validation() {
        assert!(validate_path("/repos/x/y").is_ok());
        assert!(validate_path("/search/issues?q=is:open").is_ok());
        for bad in ["repos/x", "//evil.com/x", "/x?u=https://evil", "/a b", ""] {
            let err = validate_path(bad).unwrap_err();
            assert!(matches!(err.kind(), ClientErrorKind::Validation(_)), "{}", bad);
        }
    }

    #[test]
    fn test_default_headers() {
        let credential = Credential::new(format!("ghp_{}", "a".repeat(36))).unwrap();
        let headers = default_headers(&ClientConfig::default(), &credential).unwrap();
        assert!(headers[AUTHORIZATION].is_sensitive());
        assert_eq!(headers[ACCEPT], GITHUB_JSON);
        assert_eq!(headers[API_VERSION_HEADER], crate::DEFAULT_API_VERSION);
        assert!(headers[USER_AGENT].to_str().unwrap().starts_with("octoguard/"));
    }

    #[test]
    fn test_server_delay_is_taken_once() {
        let delay = ServerDelay::new();
        assert_eq!(delay.take(), None);
        delay.set(Duration::from_millis(1500));
        assert_eq!(delay.take(), Some(Duration::from_millis(1500)));
        assert_eq!(delay.take(), None);
        delay.set(Duration::ZERO);
        assert_eq!(delay.take(), Some(Duration::ZERO));
    }

    #[test]
    fn test_build_requires_token() {
        let err = ApiClient::builder().build().unwrap_err();
        assert!(matches!(err.kind(), ClientErrorKind::InvalidCredential(_)));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = ClientConfig::default().with_retry_attempts(0);
        let err = ApiClient::new(config, format!("ghp_{}", "a".repeat(36))).unwrap_err();
        assert!(matches!(err.kind(), ClientErrorKind::InvalidConfig(_)));
    }
}
