use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde_json::Value;

use super::errors::Result;
use super::types::{AccountInfo, ApiResponse, ReportClient};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default request rates (requests per second).
pub mod rate_limits {
    /// The reporting API allows short bursts but throttles sustained traffic.
    pub const DEFAULT_RPS: u32 = 5;
}

fn quota(requests_per_second: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
}

/// A standalone token-bucket rate limiter using the governor crate.
///
/// # Example
///
/// ```ignore
/// use reportsync::platform::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::new(5);
/// limiter.wait().await;
/// client.post(&account, "/orders", &body).await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a new rate limiter with the specified requests per second.
    ///
    /// A rate of zero is treated as one request per second.
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            inner: Arc::new(RateLimiter::direct(quota(requests_per_second))),
        }
    }

    /// Wait until a request is allowed by the rate limiter.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

/// A rate-limited wrapper around any [`ReportClient`].
///
/// Every request waits on a shared token bucket before reaching the inner
/// client.
///
/// # Example
///
/// ```ignore
/// use reportsync::platform::{RateLimitedClient, rate_limits};
/// use reportsync::http::HttpReportClient;
///
/// let client = HttpReportClient::new(transport, "https://api.example.com");
/// let client = RateLimitedClient::new(client, rate_limits::DEFAULT_RPS);
/// ```
pub struct RateLimitedClient<C> {
    inner: C,
    limiter: ApiRateLimiter,
}

impl<C> RateLimitedClient<C> {
    /// Create a new rate-limited client wrapper.
    pub fn new(inner: C, requests_per_second: u32) -> Self {
        Self {
            inner,
            limiter: ApiRateLimiter::new(requests_per_second),
        }
    }

    /// Wrap a client with an existing limiter, sharing its budget.
    pub fn with_limiter(inner: C, limiter: ApiRateLimiter) -> Self {
        Self { inner, limiter }
    }

    /// Get a reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Clone> Clone for RateLimitedClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

#[async_trait]
impl<C: ReportClient> ReportClient for RateLimitedClient<C> {
    async fn post(&self, account: &AccountInfo, path: &str, body: &Value) -> Result<ApiResponse> {
        self.limiter.wait().await;
        self.inner.post(account, path, body).await
    }
}
