//! Run options and run results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entity::sync_status::SyncStatus;
use crate::entity::task_type::TaskType;

use super::pacing::PacingConfig;

/// Default delay between consecutive pages, periods and dimensions.
pub const DEFAULT_PACING_MS: u64 = 500;

/// Upper bound on pages fetched for a single period.
pub const DEFAULT_MAX_PAGES: u32 = 10_000;

/// Storage account id for account-independent (global) tasks.
pub const GLOBAL_ACCOUNT_ID: &str = "*";

/// Whether a run continues from its cursor or replays its lookback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Start after the stored cursor.
    #[default]
    Incremental,
    /// Ignore the cursor, replan from the default lookback, and archive
    /// snapshot collections before rewriting them.
    Full,
}

impl SyncMode {
    pub fn is_full(self) -> bool {
        matches!(self, SyncMode::Full)
    }
}

/// Explicit window overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowConfig {
    /// Last day to fetch (inclusive); defaults to today (UTC).
    pub end_date: Option<NaiveDate>,
    /// First day to fetch; overrides both cursor and lookback.
    pub start_date: Option<NaiveDate>,
}

/// Pagination limits applied on top of each task's page size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Lower every task's page size to at most this many records.
    pub page_size_cap: Option<u32>,
    /// Stop a period after this many pages.
    pub max_pages: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size_cap: None,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl PaginationConfig {
    /// Effective page size for a task.
    pub fn page_size(&self, task_page_size: u32) -> u32 {
        match self.page_size_cap {
            Some(cap) => task_page_size.min(cap).max(1),
            None => task_page_size.max(1),
        }
    }
}

/// Options for a sync invocation.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub mode: SyncMode,
    pub window: WindowConfig,
    pub pagination: PaginationConfig,
    pub pacing: PacingConfig,
}

/// Result of one `(account, task[, dimension])` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub account_id: String,
    pub task_type: TaskType,
    pub dimension_key: Option<String>,
    pub status: SyncStatus,
    /// The planned window was empty or there was nothing to iterate.
    pub skipped: bool,
    pub record_count: u64,
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.status.is_success()
    }

    pub(crate) fn skipped(account_id: &str, task_type: TaskType, dimension: Option<&str>) -> Self {
        Self {
            account_id: account_id.to_string(),
            task_type,
            dimension_key: dimension.map(str::to_string),
            status: SyncStatus::Success,
            skipped: true,
            record_count: 0,
            error: None,
        }
    }

    pub(crate) fn failed(
        account_id: &str,
        task_type: TaskType,
        dimension: Option<&str>,
        error: String,
    ) -> Self {
        Self {
            account_id: account_id.to_string(),
            task_type,
            dimension_key: dimension.map(str::to_string),
            status: SyncStatus::Failed,
            skipped: false,
            record_count: 0,
            error: Some(error),
        }
    }
}

/// Aggregated results of one task across accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub task_type: TaskType,
    pub success_count: usize,
    pub fail_count: usize,
    pub total_records: u64,
    pub outcomes: Vec<RunOutcome>,
}

impl TaskSummary {
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            success_count: 0,
            fail_count: 0,
            total_records: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: RunOutcome) {
        if outcome.success() {
            self.success_count += 1;
        } else {
            self.fail_count += 1;
        }
        self.total_records += outcome.record_count;
        self.outcomes.push(outcome);
    }

    pub fn success(&self) -> bool {
        self.fail_count == 0
    }

    /// Combined status of every run of this task.
    pub fn status(&self) -> SyncStatus {
        SyncStatus::combine(self.outcomes.iter().map(|o| o.status))
    }

    /// Combined status of one account's runs across its dimensions.
    ///
    /// `None` when the account was not run.
    pub fn account_status(&self, account_id: &str) -> Option<SyncStatus> {
        let mut statuses = self
            .outcomes
            .iter()
            .filter(|o| o.account_id == account_id)
            .map(|o| o.status)
            .peekable();
        statuses.peek()?;
        Some(SyncStatus::combine(statuses))
    }

    /// Errors of every failed run, joined into one line.
    pub fn error_message(&self) -> Option<String> {
        let errors: Vec<String> = self
            .outcomes
            .iter()
            .filter_map(|o| {
                o.error.as_ref().map(|e| match &o.dimension_key {
                    Some(dim) => format!("{}[{}]: {}", o.account_id, dim, e),
                    None => format!("{}: {}", o.account_id, e),
                })
            })
            .collect();
        (!errors.is_empty()).then(|| errors.join("; "))
    }
}

/// Aggregated results of a whole invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub success_count: usize,
    pub fail_count: usize,
    pub total_records: u64,
    pub tasks: Vec<TaskSummary>,
}

impl SyncSummary {
    pub fn add(&mut self, task: TaskSummary) {
        self.success_count += task.success_count;
        self.fail_count += task.fail_count;
        self.total_records += task.total_records;
        self.tasks.push(task);
    }

    pub fn success(&self) -> bool {
        self.fail_count == 0
    }
}
