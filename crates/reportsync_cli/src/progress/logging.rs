use reportsync::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
///
/// The engine already logs per page and per run; this reporter adds the
/// task-level view and keeps per-period detail at debug.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::TaskStarted {
                task_type,
                accounts,
            } => {
                tracing::info!(task = %task_type, accounts, "Starting task");
            }

            SyncProgress::RunPlanned {
                account_id,
                task_type,
                dimension,
                periods,
                window,
            } => {
                tracing::debug!(
                    account = %account_id,
                    task = %task_type,
                    dimension = ?dimension,
                    periods,
                    window = %window,
                    "Run planned"
                );
            }

            SyncProgress::RunSkipped {
                account_id,
                task_type,
                dimension,
            } => {
                tracing::debug!(account = %account_id, task = %task_type, dimension = ?dimension, "Up to date");
            }

            SyncProgress::NoDimensions {
                account_id,
                task_type,
            } => {
                tracing::info!(account = %account_id, task = %task_type, "No dimensions registered");
            }

            SyncProgress::FetchingPeriod {
                task_type,
                period,
                index,
                total,
                ..
            } => {
                tracing::debug!(task = %task_type, period = %period, index, total, "Fetching period");
            }

            SyncProgress::PersistedPeriod {
                task_type,
                period,
                records,
                archived,
                complete,
            } => {
                tracing::debug!(task = %task_type, period = %period, records, archived, complete, "Persisted period");
            }

            SyncProgress::PeriodFailed {
                task_type,
                period,
                error,
            } => {
                tracing::debug!(task = %task_type, period = %period, error = %error, "Period failed");
            }

            SyncProgress::Archived {
                account_id,
                task_type,
                rows,
            } => {
                tracing::info!(account = %account_id, task = %task_type, rows, "Archived for full resync");
            }

            SyncProgress::RunComplete {
                account_id,
                task_type,
                dimension,
                success,
                records,
                error,
            } => {
                if success {
                    tracing::debug!(account = %account_id, task = %task_type, dimension = ?dimension, records, "Run complete");
                } else {
                    tracing::warn!(
                        account = %account_id,
                        task = %task_type,
                        dimension = ?dimension,
                        records,
                        error = error.as_deref().unwrap_or("unknown"),
                        "Run failed"
                    );
                }
            }

            SyncProgress::TaskComplete {
                task_type,
                success_count,
                fail_count,
                total_records,
            } => {
                tracing::info!(task = %task_type, success_count, fail_count, total_records, "Task complete");
            }

            SyncProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
