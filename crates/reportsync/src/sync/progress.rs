//! Progress events emitted while a sync runs.
//!
//! Events mirror the run state machine: planning, one fetch/persist cycle per
//! period, finalizing. The CLI renders them as spinners or log lines.

use crate::entity::task_type::TaskType;

/// Progress events emitted during sync operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// A task is about to run over a set of accounts.
    TaskStarted {
        task_type: TaskType,
        accounts: usize,
    },

    /// The window for one run has been planned.
    RunPlanned {
        account_id: String,
        task_type: TaskType,
        dimension: Option<String>,
        /// Number of elementary periods (1 for snapshot tasks).
        periods: usize,
        /// Human-readable window, e.g. `2024-03-11..2024-03-15`.
        window: String,
    },

    /// The planned window was empty; nothing to do.
    RunSkipped {
        account_id: String,
        task_type: TaskType,
        dimension: Option<String>,
    },

    /// The account exposes no dimensions for a fan-out task.
    NoDimensions {
        account_id: String,
        task_type: TaskType,
    },

    /// Starting to fetch one period.
    FetchingPeriod {
        account_id: String,
        task_type: TaskType,
        dimension: Option<String>,
        /// Period key (empty for snapshots).
        period: String,
        /// 1-indexed position within the run.
        index: usize,
        total: usize,
    },

    /// Fetched one page.
    FetchedPage {
        task_type: TaskType,
        period: String,
        /// Page number (1-indexed).
        page: u32,
        count: usize,
        total_so_far: usize,
        /// Total reported by the API on the first page, if any.
        expected_total: Option<u64>,
    },

    /// A period was written to the store.
    PersistedPeriod {
        task_type: TaskType,
        period: String,
        records: u64,
        /// Rows soft-deleted before the write.
        archived: u64,
        /// False when only part of the period could be fetched.
        complete: bool,
    },

    /// A period could not be fetched or written.
    PeriodFailed {
        task_type: TaskType,
        period: String,
        error: String,
    },

    /// Rows were archived ahead of a full resync.
    Archived {
        account_id: String,
        task_type: TaskType,
        rows: u64,
    },

    /// One run finished.
    RunComplete {
        account_id: String,
        task_type: TaskType,
        dimension: Option<String>,
        success: bool,
        records: u64,
        error: Option<String>,
    },

    /// A task finished across all accounts.
    TaskComplete {
        task_type: TaskType,
        success_count: usize,
        fail_count: usize,
        total_records: u64,
    },

    /// Warning message (non-fatal).
    Warning { message: String },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Helper to emit progress events.
#[inline]
pub fn emit(callback: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = callback {
        cb(event);
    }
}
