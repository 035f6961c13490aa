//! One task run for one account: fan out, plan, fetch, persist, and move the
//! cursor.
//!
//! A run never returns an error. Every failure is folded into the
//! [`RunOutcome`] of the dimension it hit so the remaining dimensions and
//! periods still run.

use chrono::{DateTime, Utc};

use crate::entity::sync_status::SyncStatus;
use crate::platform::{AccountInfo, PlatformError};
use crate::repository::{self, CursorUpdate, SyncKey};

use super::chunk::{FetchUnit, plan_units};
use super::context::SyncContext;
use super::error::{Result, SyncError};
use super::fanout::{Dimension, FanoutEnumerator};
use super::pacing::PacePoint;
use super::pagination::{FetchResult, PaginationDriver};
use super::progress::SyncProgress;
use super::task::{PageRequest, PersistenceMode, TaskDescriptor};
use super::types::{GLOBAL_ACCOUNT_ID, RunOutcome};
use super::window::{WindowRequest, plan_window};

/// Executes one task for one account.
pub struct SyncRunner<'a> {
    ctx: &'a SyncContext,
    task: &'a TaskDescriptor,
}

/// Per-run bookkeeping while periods are processed.
#[derive(Debug, Default)]
struct RunTally {
    completed: usize,
    failed: usize,
    /// Failed periods that still wrote rows.
    written_partially: usize,
    records: u64,
    /// Cursor position after the last period of the unbroken completed prefix.
    completed_through: Option<DateTime<Utc>>,
    /// False once any period failed; later completions no longer move the cursor.
    contiguous: bool,
    errors: Vec<String>,
}

impl RunTally {
    fn new() -> Self {
        Self {
            contiguous: true,
            ..Self::default()
        }
    }

    fn complete(&mut self, unit: &FetchUnit, written: u64) {
        self.completed += 1;
        self.records += written;
        if self.contiguous {
            self.completed_through = Some(unit.completes_through);
        }
    }

    fn fail(&mut self, unit: &FetchUnit, error: String) {
        self.failed += 1;
        self.contiguous = false;
        if unit.period_key.is_empty() {
            self.errors.push(error);
        } else {
            self.errors.push(format!("{}: {}", unit.period_key, error));
        }
    }

    /// Record a period that wrote some rows before its fetch broke off.
    ///
    /// It counts as failed for the cursor, but the rows it wrote make the run
    /// partial rather than failed.
    fn partial(&mut self, unit: &FetchUnit, written: u64, error: String) {
        self.records += written;
        if written > 0 {
            self.written_partially += 1;
        }
        self.fail(unit, error);
    }

    fn status(&self) -> SyncStatus {
        SyncStatus::from_counts(self.completed + self.written_partially, self.failed)
    }

    fn error(&self) -> Option<String> {
        (!self.errors.is_empty()).then(|| self.errors.join("; "))
    }
}

impl<'a> SyncRunner<'a> {
    pub fn new(ctx: &'a SyncContext, task: &'a TaskDescriptor) -> Self {
        Self { ctx, task }
    }

    /// Account id rows and cursors are stored under.
    fn storage_account<'b>(&self, account: &'b AccountInfo) -> &'b str {
        if self.task.is_global() {
            GLOBAL_ACCOUNT_ID
        } else {
            &account.id
        }
    }

    /// Run the task for every dimension of `account`.
    ///
    /// Returns one outcome per dimension. Accounts with no dimensions for a
    /// fan-out task yield a single skipped outcome.
    #[tracing::instrument(
        skip_all,
        fields(account = %account.id, task = %self.task.task_type)
    )]
    pub async fn run(&self, account: &AccountInfo) -> Vec<RunOutcome> {
        let task_type = self.task.task_type;
        let storage_account = self.storage_account(account);

        let dimensions = match FanoutEnumerator::new(self.ctx.directory())
            .enumerate(&account.id, self.task.fanout)
            .await
        {
            Ok(dimensions) => dimensions,
            Err(err) => {
                tracing::warn!(error = %err, "Could not enumerate dimensions");
                return vec![self.failed(storage_account, None, err.short_message())];
            }
        };

        if dimensions.is_empty() {
            tracing::info!(fanout = self.task.fanout.as_str(), "No dimensions to sync");
            self.ctx.emit(SyncProgress::NoDimensions {
                account_id: account.id.clone(),
                task_type,
            });
            return vec![RunOutcome::skipped(storage_account, task_type, None)];
        }

        if self.ctx.options().mode.is_full()
            && self.task.persistence == PersistenceMode::ArchiveThenFullResync
        {
            match self
                .ctx
                .persistence()
                .archive_for_full_resync(self.task, storage_account)
                .await
            {
                Ok(rows) => self.ctx.emit(SyncProgress::Archived {
                    account_id: storage_account.to_string(),
                    task_type,
                    rows,
                }),
                Err(err) => {
                    tracing::error!(error = %err, "Archiving before full resync failed");
                    let err = SyncError::from(err);
                    return vec![self.failed(storage_account, None, err.short_message())];
                }
            }
        }

        let mut outcomes = Vec::with_capacity(dimensions.len());
        for (i, dimension) in dimensions.iter().enumerate() {
            if i > 0 {
                self.ctx.pacer().pause(PacePoint::Dimension).await;
            }
            outcomes.push(self.run_dimension(account, dimension.as_ref()).await);
        }
        outcomes
    }

    /// Run the task for one dimension (or the implicit one).
    #[tracing::instrument(
        skip_all,
        fields(
            account = %account.id,
            task = %self.task.task_type,
            dimension = %dimension.map(Dimension::key).unwrap_or_default()
        )
    )]
    pub async fn run_dimension(
        &self,
        account: &AccountInfo,
        dimension: Option<&Dimension>,
    ) -> RunOutcome {
        let dimension_key = dimension.map(Dimension::key);
        let key = SyncKey::new(
            self.storage_account(account),
            self.task.task_type,
            dimension_key.as_deref(),
        );

        let outcome = match self.try_run_dimension(account, dimension, &key).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %err, "Run failed");
                self.failed(&key.account_id, key.dimension(), err.short_message())
            }
        };

        self.ctx.emit(SyncProgress::RunComplete {
            account_id: key.account_id.clone(),
            task_type: key.task_type,
            dimension: dimension_key,
            success: outcome.success(),
            records: outcome.record_count,
            error: outcome.error.clone(),
        });
        outcome
    }

    async fn try_run_dimension(
        &self,
        account: &AccountInfo,
        dimension: Option<&Dimension>,
        key: &SyncKey,
    ) -> Result<RunOutcome> {
        let db = self.ctx.database();
        let options = self.ctx.options();
        let task_type = self.task.task_type;

        // PLANNING
        let cursor = repository::find_cursor(db, key).await?;
        let window = plan_window(WindowRequest {
            granularity: self.task.granularity,
            default_lookback: self.task.default_lookback,
            cursor_end: cursor.map(|c| c.last_end_at.with_timezone(&Utc)),
            mode: options.mode,
            config: &options.window,
            today: self.ctx.today(),
        })?;

        if window.is_empty() {
            tracing::info!(window = %window, "Nothing to fetch");
            self.ctx.emit(SyncProgress::RunSkipped {
                account_id: key.account_id.clone(),
                task_type,
                dimension: key.dimension().map(str::to_string),
            });
            return Ok(RunOutcome::skipped(&key.account_id, task_type, key.dimension()));
        }

        let started_at = Utc::now();
        let units = plan_units(
            &window,
            self.task.granularity,
            self.task.max_span_days,
            started_at,
        );
        tracing::info!(window = %window, periods = units.len(), "Planned run");
        self.ctx.emit(SyncProgress::RunPlanned {
            account_id: key.account_id.clone(),
            task_type,
            dimension: key.dimension().map(str::to_string),
            periods: units.len(),
            window: window.to_string(),
        });

        // FETCHING / PERSISTING
        let mut tally = RunTally::new();
        let total = units.len();
        for (i, unit) in units.iter().enumerate() {
            if i > 0 {
                self.ctx.pacer().pause(PacePoint::Period).await;
            }
            self.ctx.emit(SyncProgress::FetchingPeriod {
                account_id: key.account_id.clone(),
                task_type,
                dimension: key.dimension().map(str::to_string),
                period: unit.period_key.clone(),
                index: i + 1,
                total,
            });

            let fetched = match self.fetch_unit(account, dimension, unit).await {
                Ok(fetched) => fetched,
                Err(err) => {
                    let err = SyncError::from(err);
                    tracing::warn!(period = %unit.period_key, error = %err, "Period fetch failed");
                    self.period_failed(unit, &err);
                    tally.fail(unit, err.short_message());
                    continue;
                }
            };

            let persisted = self
                .ctx
                .persistence()
                .persist_period(self.task, key, &unit.period_key, &fetched.records, Utc::now())
                .await;
            let persisted = match persisted {
                Ok(persisted) => persisted,
                Err(err) => {
                    tracing::error!(period = %unit.period_key, error = %err, "Persisting period failed");
                    let err = SyncError::from(err);
                    self.period_failed(unit, &err);
                    tally.fail(unit, err.short_message());
                    continue;
                }
            };

            let complete = fetched.is_complete();
            self.ctx.emit(SyncProgress::PersistedPeriod {
                task_type,
                period: unit.period_key.clone(),
                records: persisted.written,
                archived: persisted.archived,
                complete,
            });

            match fetched.partial_error {
                None => {
                    tracing::info!(
                        period = %unit.period_key,
                        records = persisted.written,
                        "Period complete"
                    );
                    tally.complete(unit, persisted.written);
                }
                Some(err) => {
                    let err = SyncError::from(err);
                    tracing::warn!(
                        period = %unit.period_key,
                        records = persisted.written,
                        error = %err,
                        "Period only partially fetched"
                    );
                    self.period_failed(unit, &err);
                    tally.partial(unit, persisted.written, err.short_message());
                }
            }
        }

        // FINALIZING
        let status = tally.status();
        let error = tally.error();
        let write = repository::save_cursor(
            db,
            key,
            CursorUpdate {
                completed_through: tally.completed_through,
                synced_at: Utc::now(),
                record_count: tally.records,
                status,
                error: error.clone(),
            },
        )
        .await;

        let (status, error) = match write {
            Ok(write) => {
                tracing::debug!(?write, through = ?tally.completed_through, "Saved cursor");
                (status, error)
            }
            Err(err) => {
                tracing::error!(error = %err, "Saving cursor failed");
                let message = SyncError::from(err).short_message();
                let error = match error {
                    Some(previous) => format!("{}; {}", previous, message),
                    None => message,
                };
                (SyncStatus::Failed, Some(error))
            }
        };

        tracing::info!(
            status = %status,
            records = tally.records,
            completed = tally.completed,
            failed = tally.failed,
            "Run finished"
        );
        Ok(RunOutcome {
            account_id: key.account_id.clone(),
            task_type,
            dimension_key: key.dimension().map(str::to_string),
            status,
            skipped: false,
            record_count: tally.records,
            error,
        })
    }

    /// Fetch every segment of one unit.
    ///
    /// A failure after records were collected, in this or an earlier segment,
    /// makes the unit partial instead of failed. Later segments are not
    /// fetched once one fails.
    async fn fetch_unit(
        &self,
        account: &AccountInfo,
        dimension: Option<&Dimension>,
        unit: &FetchUnit,
    ) -> std::result::Result<FetchResult, PlatformError> {
        let ranges: Vec<_> = if unit.segments.is_empty() {
            vec![None]
        } else {
            unit.segments.iter().copied().map(Some).collect()
        };

        let page_size = self.ctx.options().pagination.page_size(self.task.page_size);
        let driver = PaginationDriver::new(
            page_size,
            self.ctx.options().pagination.max_pages,
            self.ctx.pacer(),
        );
        let client = self.ctx.client();
        let handler = self.task.handler.as_ref();
        let task_type = self.task.task_type;

        let mut combined = FetchResult::default();
        for (i, range) in ranges.into_iter().enumerate() {
            if i > 0 {
                self.ctx.pacer().pause(PacePoint::Page).await;
            }

            let already = combined.records.len();
            let result = driver
                .drive(
                    |offset, length| async move {
                        let request = PageRequest {
                            account,
                            dimension,
                            range,
                            offset,
                            length,
                        };
                        handler.fetch_page(client, &request).await
                    },
                    |page, count, so_far, expected| {
                        self.ctx.emit(SyncProgress::FetchedPage {
                            task_type,
                            period: unit.period_key.clone(),
                            page,
                            count,
                            total_so_far: already + so_far,
                            expected_total: expected,
                        });
                    },
                )
                .await;

            match result {
                Ok(segment) => {
                    combined.pages += segment.pages;
                    if combined.total.is_none() {
                        combined.total = segment.total;
                    } else if let Some(total) = segment.total {
                        combined.total = combined.total.map(|t| t + total);
                    }
                    combined.records.extend(segment.records);
                    if segment.partial_error.is_some() {
                        combined.partial_error = segment.partial_error;
                        break;
                    }
                }
                Err(err) if combined.records.is_empty() => return Err(err),
                Err(err) => {
                    combined.partial_error = Some(err);
                    break;
                }
            }
        }
        Ok(combined)
    }

    fn period_failed(&self, unit: &FetchUnit, err: &SyncError) {
        self.ctx.emit(SyncProgress::PeriodFailed {
            task_type: self.task.task_type,
            period: unit.period_key.clone(),
            error: err.short_message(),
        });
    }

    fn failed(&self, account_id: &str, dimension: Option<&str>, error: String) -> RunOutcome {
        RunOutcome::failed(account_id, self.task.task_type, dimension, error)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    fn unit(day: u32) -> FetchUnit {
        FetchUnit {
            period: None,
            period_key: format!("2024-03-{:02}", day),
            segments: Vec::new(),
            completes_through: Utc.with_ymd_and_hms(2024, 3, day, 23, 59, 59).unwrap(),
        }
    }

    #[test]
    fn test_tally_cursor_stops_at_first_gap() {
        let mut tally = RunTally::new();
        tally.complete(&unit(8), 3);
        tally.fail(&unit(9), "rate limited".to_string());
        tally.complete(&unit(10), 2);

        assert_eq!(
            tally.completed_through.map(|t| t.date_naive()),
            NaiveDate::from_ymd_opt(2024, 3, 8)
        );
        assert_eq!(tally.records, 5);
        assert_eq!(tally.status(), SyncStatus::Partial);
        assert_eq!(tally.error().as_deref(), Some("2024-03-09: rate limited"));
    }

    #[test]
    fn test_partially_written_period_makes_run_partial() {
        let mut tally = RunTally::new();
        tally.partial(&unit(10), 4, "connection reset".to_string());

        assert_eq!(tally.status(), SyncStatus::Partial);
        assert_eq!(tally.records, 4);
        assert!(tally.completed_through.is_none());
    }

    #[test]
    fn test_partial_period_without_rows_is_failed() {
        let mut tally = RunTally::new();
        tally.partial(&unit(10), 0, "connection reset".to_string());
        tally.fail(&unit(11), "boom".to_string());

        assert_eq!(tally.status(), SyncStatus::Failed);
        assert!(tally.completed_through.is_none());
    }
}
