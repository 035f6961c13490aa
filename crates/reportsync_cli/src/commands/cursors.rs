//! Cursor inspection.
//!
//! Shows how far each `(account, task, dimension)` has been synchronized and
//! how many current and archived rows each task holds.

use sea_orm::DatabaseConnection;
use serde::Serialize;
use tabled::Tabled;

use reportsync::entity::sync_cursor;
use reportsync::entity::task_type::TaskType;
use reportsync::repository::{self, RecordCounts};

use super::output::{OutputFormat, or_dash, render};

#[derive(Debug, Clone, Serialize, Tabled)]
struct CursorDisplay {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Dimension")]
    dimension: String,
    #[tabled(rename = "Synced Through")]
    synced_through: String,
    #[tabled(rename = "Last Run")]
    last_run: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Records")]
    records: i64,
    #[tabled(rename = "Error")]
    error: String,
}

impl From<&sync_cursor::Model> for CursorDisplay {
    fn from(cursor: &sync_cursor::Model) -> Self {
        Self {
            account: cursor.account_id.clone(),
            task: cursor.task_type.to_string(),
            dimension: or_dash(cursor.dimension()),
            synced_through: cursor.last_end_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            last_run: cursor.last_sync_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            status: cursor.last_status.to_string(),
            records: cursor.last_record_count,
            error: or_dash(cursor.last_error.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
struct CountDisplay {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Current")]
    active: u64,
    #[tabled(rename = "Archived")]
    archived: u64,
}

impl From<&RecordCounts> for CountDisplay {
    fn from(counts: &RecordCounts) -> Self {
        Self {
            account: counts.account_id.clone(),
            task: counts.task_type.to_string(),
            active: counts.active,
            archived: counts.archived,
        }
    }
}

#[derive(Serialize)]
struct CursorReport<'a> {
    cursors: &'a [CursorDisplay],
    records: &'a [CountDisplay],
}

/// List stored cursors and per-task row counts.
pub(crate) async fn handle_cursors(
    db: &DatabaseConnection,
    account: Option<&str>,
    task: Option<TaskType>,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let cursors: Vec<CursorDisplay> = repository::list_cursors(db, account, task)
        .await?
        .iter()
        .map(CursorDisplay::from)
        .collect();

    let records: Vec<CountDisplay> = repository::record_counts(db, account)
        .await?
        .iter()
        .filter(|c| task.is_none_or(|t| c.task_type == t))
        .map(CountDisplay::from)
        .collect();

    match output {
        OutputFormat::Json => {
            let report = CursorReport {
                cursors: &cursors,
                records: &records,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            if cursors.is_empty() {
                println!("No cursors stored yet. Run `reportsync run` first.");
            } else {
                println!("{}", render(&cursors, output)?);
            }
            if !records.is_empty() {
                println!();
                println!("{}", render(&records, output)?);
            }
        }
    }

    Ok(())
}
