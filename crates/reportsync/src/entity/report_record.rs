//! ReportRecord entity - one mirrored upstream row of any task type.
//!
//! Rows are never deleted. Soft deletion is modelled with the `archived`
//! flag: archived rows are excluded from "current" reads but kept for history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::task_type::TaskType;

/// ReportRecord model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report_records")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Natural key ─────────────────────────────────────────────────────────
    /// Owning account (`*` for account-independent reference data).
    pub account_id: String,
    /// Task that produced the row.
    pub task_type: TaskType,
    /// Fan-out dimension key, empty when the task has no sub-dimensions.
    #[sea_orm(default_value = "")]
    pub dimension_key: String,
    /// Natural key of the row within (account, task, dimension).
    pub record_key: String,

    // ─── Partitioning ────────────────────────────────────────────────────────
    /// Elementary period the row was fetched for (`2024-03-10`, `2024-03`),
    /// empty for snapshot tasks.
    #[sea_orm(default_value = "")]
    pub period_key: String,

    // ─── Content ─────────────────────────────────────────────────────────────
    /// Upstream payload as returned by the API.
    #[sea_orm(column_type = "Json")]
    pub payload: serde_json::Value,

    // ─── Tracking ────────────────────────────────────────────────────────────
    /// Soft-delete marker.
    #[sea_orm(default_value = false)]
    pub archived: bool,
    /// When the row was first written.
    pub first_seen_at: DateTimeWithTimeZone,
    /// When the row was last written by a sync.
    pub synced_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
