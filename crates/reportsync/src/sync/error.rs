use thiserror::Error;

use crate::platform::{PlatformError, short_error_message};
use crate::repository::RepositoryError;

use super::task::RegistryError;

/// Errors surfaced by the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Bad run parameters. Never retried.
    #[error("Invalid request: {message}")]
    Validation { message: String },

    /// The upstream API rejected a page.
    #[error("Upstream error: {0}")]
    Upstream(PlatformError),

    /// The upstream API throttled a page.
    #[error("Rate limited: {0}")]
    RateLimited(PlatformError),

    /// The store failed to read or write.
    #[error("Persistence error: {0}")]
    Persistence(#[from] RepositoryError),

    /// Unknown task or invalid registration. Raised before any I/O.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The account directory could not be read.
    #[error("Directory error: {message}")]
    Directory { message: String },
}

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn directory(message: impl Into<String>) -> Self {
        Self::Directory {
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// One-line message for run outcomes and progress output.
    pub fn short_message(&self) -> String {
        short_error_message(self)
    }
}

impl From<PlatformError> for SyncError {
    fn from(err: PlatformError) -> Self {
        if err.is_rate_limited() {
            Self::RateLimited(err)
        } else {
            Self::Upstream(err)
        }
    }
}

impl From<RegistryError> for SyncError {
    fn from(err: RegistryError) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<sea_orm::DbErr> for SyncError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Persistence(RepositoryError::from(err))
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
