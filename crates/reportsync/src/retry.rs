//! Retry utilities for transient store errors.
//!
//! The sync engine never retries upstream calls; the only retried operations
//! are database writes that fail because SQLite is locked or a pooled
//! connection dropped.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use sea_orm::DbErr;

/// Default initial backoff for database retries.
pub const INITIAL_DB_BACKOFF_MS: u64 = 100;

/// Upper bound for a single database retry delay.
pub const MAX_DB_BACKOFF_MS: u64 = 2_000;

/// Default number of database retry attempts.
pub const MAX_DB_RETRIES: usize = 3;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_DB_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_DB_BACKOFF_MS),
            max_retries: MAX_DB_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    /// A configuration that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Whether a database error is transient (locked, busy, dropped connection).
pub fn is_retryable_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(_) | DbErr::Query(_) => {
            let err_str = err.to_string().to_lowercase();
            // SQLite: database is locked, busy
            // PostgreSQL: connection refused, too many connections
            err_str.contains("locked")
                || err_str.contains("busy")
                || err_str.contains("timeout")
                || err_str.contains("connection")
                || err_str.contains("temporarily unavailable")
        }
        _ => false,
    }
}

/// Run a fallible store operation, retrying while `is_transient` holds.
///
/// `label` names the operation in debug logs.
pub async fn with_retry<T, E, F, Fut, IsTransient>(
    mut operation: F,
    config: RetryConfig,
    is_transient: IsTransient,
    label: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    IsTransient: Fn(&E) -> bool,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(config.into_backoff())
        .notify(|err, dur| {
            tracing::warn!(
                operation = label,
                attempt = attempt.load(Ordering::SeqCst),
                retry_in_ms = dur.as_millis() as u64,
                error = %err,
                "Transient store error, retrying"
            );
        })
        .when(|e| is_transient(e))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();

        assert_eq!(config.min_delay, Duration::from_millis(INITIAL_DB_BACKOFF_MS));
        assert_eq!(config.max_delay, Duration::from_millis(MAX_DB_BACKOFF_MS));
        assert_eq!(config.max_retries, MAX_DB_RETRIES);
        assert!(config.with_jitter);
    }

    #[test]
    fn test_retry_config_disabled() {
        assert_eq!(RetryConfig::disabled().max_retries, 0);
    }

    #[test]
    fn test_retryable_db_errors() {
        assert!(is_retryable_db_error(&DbErr::Conn(
            sea_orm::RuntimeErr::Internal("reset".to_string())
        )));
        assert!(is_retryable_db_error(&DbErr::Exec(
            sea_orm::RuntimeErr::Internal("database is locked".to_string())
        )));
        assert!(!is_retryable_db_error(&DbErr::Exec(
            sea_orm::RuntimeErr::Internal("UNIQUE constraint failed".to_string())
        )));
        assert!(!is_retryable_db_error(&DbErr::RecordNotFound(
            "x".to_string()
        )));
    }

    #[tokio::test]
    async fn with_retry_retries_transient_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                let n = calls_capture.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("database is locked".to_string())
                } else {
                    Ok(7u64)
                }
            }
        };

        let config = RetryConfig::new(Duration::from_millis(1), Duration::from_millis(2), 3)
            .with_jitter(false);
        let result = with_retry(operation, config, |e: &String| e.contains("locked"), "test")
            .await
            .expect("should succeed after retries");

        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn with_retry_does_not_retry_permanent_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("constraint violated".to_string())
            }
        };

        let err = with_retry(
            operation,
            RetryConfig::default(),
            |e: &String| e.contains("locked"),
            "test",
        )
        .await
        .expect_err("expected error");

        assert_eq!(err, "constraint violated");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
