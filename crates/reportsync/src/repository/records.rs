use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
    sea_query::{Expr, OnConflict},
};
use serde_json::Value;
use uuid::Uuid;

use crate::entity::report_record::{ActiveModel, Column, Entity as ReportRecord, Model};
use crate::entity::task_type::TaskType;

use super::errors::Result;
use super::key::SyncKey;

/// Rows per INSERT statement; keeps bound parameters well under SQLite's limit.
const UPSERT_CHUNK_SIZE: usize = 500;

/// One row ready to be written for a [`SyncKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// Natural key within the sync key.
    pub record_key: String,
    /// Elementary period the row belongs to, empty for snapshots.
    pub period_key: String,
    /// Upstream payload.
    pub payload: Value,
}

/// Stored row counts for one (account, task) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCounts {
    pub account_id: String,
    pub task_type: TaskType,
    pub active: u64,
    pub archived: u64,
}

/// Build the ON CONFLICT clause used by bulk upsert.
///
/// The natural key is `(account_id, task_type, dimension_key, record_key)`.
/// Re-ingesting a row replaces its payload and period and clears `archived`;
/// `id` and `first_seen_at` keep their original values.
pub(crate) fn build_upsert_on_conflict() -> OnConflict {
    OnConflict::columns([
        Column::AccountId,
        Column::TaskType,
        Column::DimensionKey,
        Column::RecordKey,
    ])
    .update_columns([
        Column::PeriodKey,
        Column::Payload,
        Column::Archived,
        Column::SyncedAt,
    ])
    .to_owned()
}

/// Collapse duplicate record keys, keeping the last occurrence in its
/// original position.
pub(crate) fn dedupe_last_wins(records: Vec<NewRecord>) -> Vec<NewRecord> {
    let mut last_index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        last_index.insert(record.record_key.clone(), i);
    }
    records
        .into_iter()
        .enumerate()
        .filter(|(i, r)| last_index.get(&r.record_key) == Some(i))
        .map(|(_, r)| r)
        .collect()
}

fn to_active_model(key: &SyncKey, record: NewRecord, now: DateTime<Utc>) -> ActiveModel {
    let now = now.fixed_offset();
    ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(key.account_id.clone()),
        task_type: Set(key.task_type),
        dimension_key: Set(key.dimension_key.clone()),
        record_key: Set(record.record_key),
        period_key: Set(record.period_key),
        payload: Set(record.payload),
        archived: Set(false),
        first_seen_at: Set(now),
        synced_at: Set(now),
    }
}

/// Upsert records for one sync key using SQL ON CONFLICT.
///
/// Duplicate keys inside `records` are collapsed (last wins) so a single
/// statement never touches the same row twice.
///
/// # Returns
/// The number of distinct records written.
pub async fn bulk_upsert<C>(
    db: &C,
    key: &SyncKey,
    records: Vec<NewRecord>,
    now: DateTime<Utc>,
) -> Result<u64>
where
    C: ConnectionTrait,
{
    let records = dedupe_last_wins(records);
    if records.is_empty() {
        return Ok(0);
    }

    let written = records.len() as u64;
    let mut models: Vec<ActiveModel> = records
        .into_iter()
        .map(|r| to_active_model(key, r, now))
        .collect();

    while !models.is_empty() {
        let rest = models.split_off(models.len().min(UPSERT_CHUNK_SIZE));
        ReportRecord::insert_many(models)
            .on_conflict(build_upsert_on_conflict())
            .exec_without_returning(db)
            .await?;
        models = rest;
    }

    tracing::debug!(key = %key, count = written, "Upserted records");
    Ok(written)
}

/// Soft-delete every live row of one period.
///
/// Returns the number of rows archived.
pub async fn archive_period<C>(db: &C, key: &SyncKey, period_key: &str) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = ReportRecord::update_many()
        .col_expr(Column::Archived, Expr::value(true))
        .filter(Column::AccountId.eq(key.account_id.as_str()))
        .filter(Column::TaskType.eq(key.task_type))
        .filter(Column::DimensionKey.eq(key.dimension_key.as_str()))
        .filter(Column::PeriodKey.eq(period_key))
        .filter(Column::Archived.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Soft-delete every live row of a task for an account, across all
/// dimensions and periods.
///
/// Returns the number of rows archived.
pub async fn archive_task<C>(db: &C, account_id: &str, task_type: TaskType) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = ReportRecord::update_many()
        .col_expr(Column::Archived, Expr::value(true))
        .filter(Column::AccountId.eq(account_id))
        .filter(Column::TaskType.eq(task_type))
        .filter(Column::Archived.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Count live rows for a sync key.
pub async fn count_active<C>(db: &C, key: &SyncKey) -> Result<u64>
where
    C: ConnectionTrait,
{
    let count = ReportRecord::find()
        .filter(Column::AccountId.eq(key.account_id.as_str()))
        .filter(Column::TaskType.eq(key.task_type))
        .filter(Column::DimensionKey.eq(key.dimension_key.as_str()))
        .filter(Column::Archived.eq(false))
        .count(db)
        .await?;
    Ok(count)
}

/// Count rows of one period, split into (live, archived).
pub async fn count_in_period<C>(db: &C, key: &SyncKey, period_key: &str) -> Result<(u64, u64)>
where
    C: ConnectionTrait,
{
    let base = ReportRecord::find()
        .filter(Column::AccountId.eq(key.account_id.as_str()))
        .filter(Column::TaskType.eq(key.task_type))
        .filter(Column::DimensionKey.eq(key.dimension_key.as_str()))
        .filter(Column::PeriodKey.eq(period_key));

    let live = base
        .clone()
        .filter(Column::Archived.eq(false))
        .count(db)
        .await?;
    let archived = base.filter(Column::Archived.eq(true)).count(db).await?;
    Ok((live, archived))
}

/// Live rows for a sync key, ordered by period then record key.
pub async fn find_active<C>(db: &C, key: &SyncKey) -> Result<Vec<Model>>
where
    C: ConnectionTrait,
{
    let rows = ReportRecord::find()
        .filter(Column::AccountId.eq(key.account_id.as_str()))
        .filter(Column::TaskType.eq(key.task_type))
        .filter(Column::DimensionKey.eq(key.dimension_key.as_str()))
        .filter(Column::Archived.eq(false))
        .order_by_asc(Column::PeriodKey)
        .order_by_asc(Column::RecordKey)
        .all(db)
        .await?;
    Ok(rows)
}

/// Live/archived row counts grouped by account and task.
pub async fn record_counts<C>(db: &C, account_id: Option<&str>) -> Result<Vec<RecordCounts>>
where
    C: ConnectionTrait,
{
    let mut query = ReportRecord::find()
        .select_only()
        .column(Column::AccountId)
        .column(Column::TaskType)
        .column(Column::Archived)
        .column_as(Column::Id.count(), "row_count")
        .group_by(Column::AccountId)
        .group_by(Column::TaskType)
        .group_by(Column::Archived)
        .order_by_asc(Column::AccountId)
        .order_by_asc(Column::TaskType);

    if let Some(account_id) = account_id {
        query = query.filter(Column::AccountId.eq(account_id));
    }

    let rows: Vec<(String, TaskType, bool, i64)> = query.into_tuple().all(db).await?;

    let mut counts: Vec<RecordCounts> = Vec::new();
    for (account, task_type, archived, n) in rows {
        let same_group = counts
            .last()
            .is_some_and(|last| last.account_id == account && last.task_type == task_type);
        if !same_group {
            counts.push(RecordCounts {
                account_id: account,
                task_type,
                active: 0,
                archived: 0,
            });
        }
        if let Some(entry) = counts.last_mut() {
            let n = n.max(0) as u64;
            if archived {
                entry.archived += n;
            } else {
                entry.active += n;
            }
        }
    }
    Ok(counts)
}
