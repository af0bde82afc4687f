//! Rate limiting middleware using Governor.
//!
//! Implements per-client rate limiting with a token bucket algorithm.

use std::{
    net::SocketAddr,
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};

use paytrack_types::AppError;

use super::response::ApiError;

/// How often the limiter table is checked for growth.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Table size above which a sweep clears every bucket.
pub const SWEEP_THRESHOLD: usize = 10_000;

const RATE_LIMITED: &str = "Too many requests. Please try again later.";

/// Rate limiter state shared across requests.
pub struct RateLimitState {
    /// Per-client rate limiters
    limiters: DashMap<String, Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    /// Quota for new clients
    quota: Quota,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::per_minute(100)
    }
}

impl RateLimitState {
    /// Allows `requests` per minute per client, with bursts up to the same count.
    pub fn per_minute(requests: u32) -> Self {
        let requests = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        Self {
            limiters: DashMap::new(),
            quota: Quota::per_minute(requests),
        }
    }

    /// Returns true if the request is allowed, false if rate limited.
    pub fn check(&self, key: &str) -> bool {
        let limiter = self
            .limiters
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::direct(self.quota)))
            .clone();

        limiter.check().is_ok()
    }

    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Drops every bucket once the table holds more than `threshold` clients.
    /// Returns the number of buckets removed.
    pub fn sweep(&self, threshold: usize) -> usize {
        let size = self.limiters.len();
        if size <= threshold {
            return 0;
        }
        self.limiters.clear();
        size
    }
}

/// Identifies the client: socket address, then `X-Forwarded-For`, then "unknown".
fn client_key(request: &Request<Body>) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimitState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Skip rate limiting for health endpoint
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let key = client_key(&request);
    if !limiter.check(&key) {
        tracing::warn!(client = %key, "Rate limit exceeded");
        return ApiError(AppError::TooManyRequests(RATE_LIMITED.into())).into_response();
    }

    next.run(request).await
}
