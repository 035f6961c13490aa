use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::sync_cursor::{ActiveModel, Column, Entity as SyncCursor, Model};
use crate::entity::sync_status::SyncStatus;
use crate::entity::task_type::TaskType;

use super::errors::Result;
use super::key::SyncKey;

/// Result of one run, as recorded on its cursor.
#[derive(Debug, Clone)]
pub struct CursorUpdate {
    /// End of the last fully completed period, if any period completed.
    pub completed_through: Option<DateTime<Utc>>,
    /// When the run finished.
    pub synced_at: DateTime<Utc>,
    /// Records persisted by the run.
    pub record_count: u64,
    /// Run outcome.
    pub status: SyncStatus,
    /// Joined error message for partial and failed runs.
    pub error: Option<String>,
}

/// What [`save_cursor`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorWrite {
    /// A new cursor row was inserted.
    Created,
    /// The high-water mark moved forward.
    Advanced,
    /// Only the last-run fields changed.
    Touched,
    /// No cursor exists and nothing completed, so nothing was written.
    Skipped,
}

fn key_filter(key: &SyncKey) -> sea_orm::Select<SyncCursor> {
    SyncCursor::find()
        .filter(Column::AccountId.eq(key.account_id.as_str()))
        .filter(Column::TaskType.eq(key.task_type))
        .filter(Column::DimensionKey.eq(key.dimension_key.as_str()))
}

/// Find the cursor for a sync key.
pub async fn find_cursor<C>(db: &C, key: &SyncKey) -> Result<Option<Model>>
where
    C: ConnectionTrait,
{
    Ok(key_filter(key).one(db).await?)
}

/// Record the result of a run.
///
/// `last_end_at` only ever moves forward: a `completed_through` earlier than
/// the stored value leaves the mark where it is. When no period completed the
/// cursor is not created, and an existing one only has its last-run fields
/// refreshed.
pub async fn save_cursor<C>(db: &C, key: &SyncKey, update: CursorUpdate) -> Result<CursorWrite>
where
    C: ConnectionTrait,
{
    let existing = find_cursor(db, key).await?;
    let record_count = i64::try_from(update.record_count).unwrap_or(i64::MAX);

    let Some(existing) = existing else {
        let Some(end_at) = update.completed_through else {
            return Ok(CursorWrite::Skipped);
        };
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(key.account_id.clone()),
            task_type: Set(key.task_type),
            dimension_key: Set(key.dimension_key.clone()),
            last_end_at: Set(end_at.fixed_offset()),
            last_sync_at: Set(update.synced_at.fixed_offset()),
            last_record_count: Set(record_count),
            last_status: Set(update.status),
            last_error: Set(update.error),
        };
        model.insert(db).await?;
        return Ok(CursorWrite::Created);
    };

    let previous_end = existing.last_end_at;
    let mut active: ActiveModel = existing.into();

    let mut write = CursorWrite::Touched;
    if let Some(end_at) = update.completed_through {
        let end_at = end_at.fixed_offset();
        if end_at > previous_end {
            active.last_end_at = Set(end_at);
            write = CursorWrite::Advanced;
        }
    }
    active.last_sync_at = Set(update.synced_at.fixed_offset());
    active.last_record_count = Set(record_count);
    active.last_status = Set(update.status);
    active.last_error = Set(update.error);
    active.update(db).await?;

    Ok(write)
}

/// List cursors, optionally restricted to an account and/or task.
pub async fn list_cursors<C>(
    db: &C,
    account_id: Option<&str>,
    task_type: Option<TaskType>,
) -> Result<Vec<Model>>
where
    C: ConnectionTrait,
{
    let mut query = SyncCursor::find();
    if let Some(account_id) = account_id {
        query = query.filter(Column::AccountId.eq(account_id));
    }
    if let Some(task_type) = task_type {
        query = query.filter(Column::TaskType.eq(task_type));
    }
    let cursors = query
        .order_by_asc(Column::AccountId)
        .order_by_asc(Column::TaskType)
        .order_by_asc(Column::DimensionKey)
        .all(db)
        .await?;
    Ok(cursors)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;

    fn update(completed_through: Option<DateTime<Utc>>) -> CursorUpdate {
        CursorUpdate {
            completed_through,
            synced_at: Utc::now(),
            record_count: 0,
            status: SyncStatus::Failed,
            error: Some("boom".to_string()),
        }
    }

    #[tokio::test]
    async fn save_cursor_skips_when_nothing_completed_and_no_cursor() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<Model>::new()])
            .into_connection();

        let key = SyncKey::new("acct-1", TaskType::Orders, None);
        let write = save_cursor(&db, &key, update(None))
            .await
            .expect("save_cursor should succeed");
        assert_eq!(write, CursorWrite::Skipped);

        // Only the lookup ran.
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn save_cursor_never_moves_backward() {
        let stored_end = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap();
        let existing = Model {
            id: Uuid::new_v4(),
            account_id: "acct-1".to_string(),
            task_type: TaskType::Orders,
            dimension_key: String::new(),
            last_end_at: stored_end.fixed_offset(),
            last_sync_at: stored_end.fixed_offset(),
            last_record_count: 3,
            last_status: SyncStatus::Success,
            last_error: None,
        };
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![existing.clone()], vec![existing]])
            .append_exec_results([MockExecResult {
                rows_affected: 1,
                last_insert_id: 0,
            }])
            .into_connection();

        let key = SyncKey::new("acct-1", TaskType::Orders, None);
        let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let write = save_cursor(&db, &key, update(Some(earlier)))
            .await
            .expect("save_cursor should succeed");
        assert_eq!(write, CursorWrite::Touched);
    }
}
