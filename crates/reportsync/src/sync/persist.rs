//! Write strategies applied to fetched periods.
//!
//! - Upsert-by-key and archive-then-full-resync both upsert on the record's
//!   natural key. Rows without one cannot be matched on the next run and are
//!   dropped with a warning.
//! - Overwrite-by-period archives the live rows of the period and upserts the
//!   new ones inside one transaction, so the stored period mirrors the latest
//!   fetch exactly.
//!
//! Every write is retried on transient store errors (locked database, dropped
//! connection) with exponential backoff.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::Value;

use crate::entity::task_type::TaskType;
use crate::repository::{self, NewRecord, RepositoryError, SyncKey};
use crate::retry::{RetryConfig, with_retry};

use super::task::{PersistenceMode, TaskDescriptor};

/// What one period write did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    /// Distinct rows upserted.
    pub written: u64,
    /// Rows archived before the write (overwrite-by-period only).
    pub archived: u64,
    /// Records dropped because they had no natural key.
    pub skipped: usize,
}

/// Turn fetched records into storable rows.
///
/// Overwrite-by-period keys rows by period and natural key, falling back to
/// the record's position in the fetch (`{period}#@{ordinal}`) when the
/// handler has no key for it.
/// The other modes require a natural key.
pub(crate) fn prepare_records(
    descriptor: &TaskDescriptor,
    period_key: &str,
    records: &[Value],
) -> (Vec<NewRecord>, usize) {
    let mut rows = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for (ordinal, payload) in records.iter().enumerate() {
        let natural = descriptor.handler.natural_key(payload);
        let record_key = match descriptor.persistence {
            PersistenceMode::OverwriteByPeriod => match natural {
                Some(key) => format!("{}#{}", period_key, key),
                // `@` keeps positional keys apart from natural ones.
                None => format!("{}#@{}", period_key, ordinal),
            },
            PersistenceMode::UpsertByKey | PersistenceMode::ArchiveThenFullResync => {
                match natural {
                    Some(key) => key,
                    None => {
                        skipped += 1;
                        continue;
                    }
                }
            }
        };
        rows.push(NewRecord {
            record_key,
            period_key: period_key.to_string(),
            payload: payload.clone(),
        });
    }

    (rows, skipped)
}

/// Applies a task's persistence mode against the report store.
#[derive(Debug, Clone)]
pub struct PersistencePolicy {
    db: Arc<DatabaseConnection>,
    retry: RetryConfig,
}

impl PersistencePolicy {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry schedule for transient store errors.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Write the records fetched for one period (or one snapshot).
    pub async fn persist_period(
        &self,
        descriptor: &TaskDescriptor,
        key: &SyncKey,
        period_key: &str,
        records: &[Value],
        now: DateTime<Utc>,
    ) -> Result<PersistOutcome, RepositoryError> {
        let (rows, skipped) = prepare_records(descriptor, period_key, records);
        if skipped > 0 {
            tracing::warn!(
                key = %key,
                period = period_key,
                skipped,
                "Records without a natural key were not stored"
            );
        }

        let db = self.db.as_ref();
        let (archived, written) = match descriptor.persistence {
            PersistenceMode::OverwriteByPeriod => {
                with_retry(
                    move || self.overwrite_period(key, period_key, rows.clone(), now),
                    self.retry.clone(),
                    RepositoryError::is_transient,
                    "overwrite_period",
                )
                .await?
            }
            PersistenceMode::UpsertByKey | PersistenceMode::ArchiveThenFullResync => {
                let written = with_retry(
                    move || repository::bulk_upsert(db, key, rows.clone(), now),
                    self.retry.clone(),
                    RepositoryError::is_transient,
                    "bulk_upsert",
                )
                .await?;
                (0, written)
            }
        };

        tracing::debug!(
            key = %key,
            period = period_key,
            written,
            archived,
            "Persisted period"
        );
        Ok(PersistOutcome {
            written,
            archived,
            skipped,
        })
    }

    async fn overwrite_period(
        &self,
        key: &SyncKey,
        period_key: &str,
        rows: Vec<NewRecord>,
        now: DateTime<Utc>,
    ) -> Result<(u64, u64), RepositoryError> {
        let txn = self.db.begin().await?;
        let archived = repository::archive_period(&txn, key, period_key).await?;
        let written = repository::bulk_upsert(&txn, key, rows, now).await?;
        txn.commit().await?;
        Ok((archived, written))
    }

    /// Archive every collection a full resync of `descriptor` rewrites.
    ///
    /// `account_id` is the storage account: the account itself, or the
    /// global key for account-independent tasks.
    pub async fn archive_for_full_resync(
        &self,
        descriptor: &TaskDescriptor,
        account_id: &str,
    ) -> Result<u64, RepositoryError> {
        let mut total = 0;
        for &target in &descriptor.archive_targets {
            total += self.archive_task(account_id, target).await?;
        }
        Ok(total)
    }

    async fn archive_task(
        &self,
        account_id: &str,
        task_type: TaskType,
    ) -> Result<u64, RepositoryError> {
        let db = self.db.as_ref();
        let rows = with_retry(
            move || repository::archive_task(db, account_id, task_type),
            self.retry.clone(),
            RepositoryError::is_transient,
            "archive_task",
        )
        .await?;
        tracing::info!(
            account = account_id,
            task = %task_type,
            rows,
            "Archived rows ahead of full resync"
        );
        Ok(rows)
    }
}
