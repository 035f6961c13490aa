use sea_orm::DbErr;
use thiserror::Error;

use crate::entity::task_type::TaskType;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Row not found.
    #[error("Not found: {context}")]
    NotFound { context: String },

    /// Invalid input data.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl RepositoryError {
    /// Create a NotFound error for an account lookup.
    pub fn account_not_found(account_id: &str) -> Self {
        Self::NotFound {
            context: format!("account={}", account_id),
        }
    }

    /// Create a NotFound error for a cursor lookup.
    pub fn cursor_not_found(account_id: &str, task_type: TaskType, dimension_key: &str) -> Self {
        Self::NotFound {
            context: format!(
                "cursor account={} task={} dimension={:?}",
                account_id, task_type, dimension_key
            ),
        }
    }

    /// Whether retrying the operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(e) => crate::retry::is_retryable_db_error(e),
            _ => false,
        }
    }
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
