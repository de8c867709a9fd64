//! Request and response interceptors.
//!
//! Interceptors are pure transforms run in registration order. Request
//! interceptors see the fully prepared request once, before the first attempt.
//! Response interceptors see every response returned to the caller, cached or
//! not. Cached bodies are stored before response interceptors run.

use crate::{ApiResponse, PreparedRequest};

/// Transform applied to every outgoing request.
pub trait RequestInterceptor: Send + Sync {
    /// Return the request to send.
    fn intercept(&self, request: PreparedRequest) -> PreparedRequest;
}

/// Transform applied to every response before it reaches the caller.
pub trait ResponseInterceptor: Send + Sync {
    /// Return the response to hand back.
    fn intercept(&self, response: ApiResponse) -> ApiResponse;
}

impl<F> RequestInterceptor for F
where
    F: Fn(PreparedRequest) -> PreparedRequest + Send + Sync,
{
    fn intercept(&self, request: PreparedRequest) -> PreparedRequest {
        self(request)
    }
}

impl<F> ResponseInterceptor for F
where
    F: Fn(ApiResponse) -> ApiResponse + Send + Sync,
{
    fn intercept(&self, response: ApiResponse) -> ApiResponse {
        self(response)
    }
}
