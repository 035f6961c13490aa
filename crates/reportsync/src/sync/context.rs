//! Sync context builder.
//!
//! Bundles the collaborators a run needs (upstream client, directory, store,
//! pacing and progress reporting) so runners and the orchestrator take one
//! argument instead of six.
//!
//! # Example
//!
//! ```ignore
//! use reportsync::sync::{SyncContext, SyncOptions};
//!
//! let ctx = SyncContext::builder()
//!     .client(Arc::new(http_client))
//!     .database(Arc::new(db))
//!     .options(SyncOptions::default())
//!     .progress(callback)
//!     .build()?;
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::DatabaseConnection;

use crate::platform::ReportClient;
use crate::retry::RetryConfig;

use super::directory::DbDirectory;
use super::error::{Result, SyncError};
use super::fanout::Directory;
use super::pacing::Pacer;
use super::persist::PersistencePolicy;
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::SyncOptions;

/// Builder for creating a [`SyncContext`].
#[derive(Default)]
pub struct SyncContextBuilder {
    client: Option<Arc<dyn ReportClient>>,
    directory: Option<Arc<dyn Directory>>,
    database: Option<Arc<DatabaseConnection>>,
    options: Option<SyncOptions>,
    pacer: Option<Arc<dyn Pacer>>,
    progress: Option<Arc<ProgressCallback>>,
    retry: Option<RetryConfig>,
    today: Option<NaiveDate>,
}

impl SyncContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the upstream client.
    pub fn client(mut self, client: Arc<dyn ReportClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the account directory. Defaults to the tables of the store.
    pub fn directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Set the database connection.
    pub fn database(mut self, db: Arc<DatabaseConnection>) -> Self {
        self.database = Some(db);
        self
    }

    /// Set sync options.
    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Replace the pacer built from `options.pacing`.
    pub fn pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Set the progress callback.
    pub fn progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Set the retry schedule for transient store errors.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Pin "today" instead of reading the clock.
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Build the sync context.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Configuration` if the client or database is missing.
    pub fn build(self) -> Result<SyncContext> {
        let client = self
            .client
            .ok_or_else(|| SyncError::configuration("sync context requires a client"))?;
        let db = self
            .database
            .ok_or_else(|| SyncError::configuration("sync context requires a database"))?;
        let options = self.options.unwrap_or_default();

        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(DbDirectory::new(Arc::clone(&db))));
        let pacer = self.pacer.unwrap_or_else(|| options.pacing.build());
        let persistence = match self.retry {
            Some(retry) => PersistencePolicy::new(db).with_retry(retry),
            None => PersistencePolicy::new(db),
        };

        Ok(SyncContext {
            client,
            directory,
            persistence,
            options,
            pacer,
            progress: self.progress,
            today: self.today,
        })
    }
}

/// Everything a sync run needs, shared by runners of one invocation.
pub struct SyncContext {
    client: Arc<dyn ReportClient>,
    directory: Arc<dyn Directory>,
    persistence: PersistencePolicy,
    options: SyncOptions,
    pacer: Arc<dyn Pacer>,
    progress: Option<Arc<ProgressCallback>>,
    today: Option<NaiveDate>,
}

impl SyncContext {
    /// Create a new builder.
    pub fn builder() -> SyncContextBuilder {
        SyncContextBuilder::new()
    }

    pub fn client(&self) -> &dyn ReportClient {
        self.client.as_ref()
    }

    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    pub fn persistence(&self) -> &PersistencePolicy {
        &self.persistence
    }

    pub fn database(&self) -> &DatabaseConnection {
        self.persistence.db()
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn pacer(&self) -> &dyn Pacer {
        self.pacer.as_ref()
    }

    /// Today's date in UTC, unless pinned by the builder.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Emit a progress event to the registered callback, if any.
    pub fn emit(&self, event: SyncProgress) {
        emit(self.progress.as_deref(), event);
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("options", &self.options)
            .field("today", &self.today)
            .field("has_progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{AccountInfo, ApiResponse, PlatformError};
    use async_trait::async_trait;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::Value;

    struct NullClient;

    #[async_trait]
    impl ReportClient for NullClient {
        async fn post(
            &self,
            _account: &AccountInfo,
            _path: &str,
            _body: &Value,
        ) -> std::result::Result<ApiResponse, PlatformError> {
            Err(PlatformError::internal("unused"))
        }
    }

    #[test]
    fn test_build_requires_client_and_database() {
        let err = SyncContext::builder().build().unwrap_err();
        assert!(matches!(err, SyncError::Configuration { .. }));
        assert!(err.to_string().contains("client"));

        let err = SyncContext::builder()
            .client(Arc::new(NullClient))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("database"));
    }

    #[test]
    fn test_today_override() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let ctx = SyncContext::builder()
            .client(Arc::new(NullClient))
            .database(Arc::new(
                MockDatabase::new(DatabaseBackend::Sqlite).into_connection(),
            ))
            .today(today)
            .build()
            .unwrap();
        assert_eq!(ctx.today(), today);
    }
}
