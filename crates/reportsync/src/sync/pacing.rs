//! Pauses between consecutive upstream calls.
//!
//! Runs are strictly sequential; the pacer decides how long to wait before
//! the next page, period or dimension. The first item of each level never
//! waits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::platform::{ApiRateLimiter, rate_limits};

use super::types::DEFAULT_PACING_MS;

/// Point in the run at which a pause is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacePoint {
    /// Before the next page of the same period.
    Page,
    /// Before the next period of the same run.
    Period,
    /// Before the next dimension of the same account.
    Dimension,
}

/// Pacing strategy.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, point: PacePoint);
}

/// Sleep a fixed delay at every pace point.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_PACING_MS))
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self, _point: PacePoint) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Token bucket shared across all pace points.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    limiter: ApiRateLimiter,
}

impl TokenBucket {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            limiter: ApiRateLimiter::new(requests_per_second),
        }
    }
}

#[async_trait]
impl Pacer for TokenBucket {
    async fn pause(&self, _point: PacePoint) {
        self.limiter.wait().await;
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pause(&self, _point: PacePoint) {}
}

/// Which pacer to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingStrategy {
    #[default]
    Fixed,
    TokenBucket,
    None,
}

impl std::str::FromStr for PacingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fixed" => Ok(PacingStrategy::Fixed),
            "token_bucket" => Ok(PacingStrategy::TokenBucket),
            "none" | "off" => Ok(PacingStrategy::None),
            _ => Err(format!("Unknown pacing strategy: {}", s)),
        }
    }
}

/// Pacing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingConfig {
    pub strategy: PacingStrategy,
    /// Delay for [`PacingStrategy::Fixed`].
    pub delay: Duration,
    /// Rate for [`PacingStrategy::TokenBucket`].
    pub requests_per_second: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            strategy: PacingStrategy::Fixed,
            delay: Duration::from_millis(DEFAULT_PACING_MS),
            requests_per_second: rate_limits::DEFAULT_RPS,
        }
    }
}

impl PacingConfig {
    /// Configuration that never waits.
    pub fn none() -> Self {
        Self {
            strategy: PacingStrategy::None,
            ..Self::default()
        }
    }

    pub fn build(&self) -> Arc<dyn Pacer> {
        match self.strategy {
            PacingStrategy::Fixed => Arc::new(FixedDelay::new(self.delay)),
            PacingStrategy::TokenBucket => Arc::new(TokenBucket::new(self.requests_per_second)),
            PacingStrategy::None => Arc::new(NoDelay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacing_strategy_parse() {
        assert_eq!("fixed".parse::<PacingStrategy>().unwrap(), PacingStrategy::Fixed);
        assert_eq!(
            "token-bucket".parse::<PacingStrategy>().unwrap(),
            PacingStrategy::TokenBucket
        );
        assert_eq!("NONE".parse::<PacingStrategy>().unwrap(), PacingStrategy::None);
        assert!("jitter".parse::<PacingStrategy>().is_err());
    }

    #[test]
    fn test_default_pacing_is_fixed_500ms() {
        let config = PacingConfig::default();
        assert_eq!(config.strategy, PacingStrategy::Fixed);
        assert_eq!(config.delay, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_sleeps_configured_duration() {
        let pacer = FixedDelay::new(Duration::from_millis(500));
        let start = tokio::time::Instant::now();
        pacer.pause(PacePoint::Page).await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_no_delay_returns_immediately() {
        let pacer = PacingConfig::none().build();
        let start = std::time::Instant::now();
        for _ in 0..100 {
            pacer.pause(PacePoint::Dimension).await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
