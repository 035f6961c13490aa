//! SyncCursor entity - persisted high-water mark per (account, task, dimension).
//!
//! A cursor is created lazily the first time a run completes at least one
//! elementary period and is updated in place afterwards. `last_end_at` never
//! moves backward; see `repository::advance_cursor`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::sync_status::SyncStatus;
use crate::entity::task_type::TaskType;

/// SyncCursor model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_cursors")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Key ─────────────────────────────────────────────────────────────────
    /// Account the cursor belongs to (`*` for account-independent tasks).
    pub account_id: String,
    /// Task the cursor tracks.
    pub task_type: TaskType,
    /// Fan-out dimension key, empty for tasks without sub-dimensions.
    #[sea_orm(default_value = "")]
    pub dimension_key: String,

    // ─── High-water mark ─────────────────────────────────────────────────────
    /// End of the last fully completed elementary period.
    pub last_end_at: DateTimeWithTimeZone,

    // ─── Last run ────────────────────────────────────────────────────────────
    /// When the last run for this key finished.
    pub last_sync_at: DateTimeWithTimeZone,
    /// Records persisted by the last run.
    pub last_record_count: i64,
    /// Outcome of the last run.
    pub last_status: SyncStatus,
    /// Joined error message of the last run, if it was not a full success.
    #[sea_orm(column_type = "Text", nullable)]
    pub last_error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Dimension key as an option (empty string means no dimension).
    pub fn dimension(&self) -> Option<&str> {
        if self.dimension_key.is_empty() {
            None
        } else {
            Some(&self.dimension_key)
        }
    }
}
