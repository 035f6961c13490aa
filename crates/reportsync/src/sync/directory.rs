//! [`Directory`] backed by the `accounts` and `account_dimensions` tables.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::entity::dimension_kind::DimensionKind;
use crate::platform::AccountInfo;
use crate::repository;

use super::error::{Result, SyncError};
use super::fanout::{DimensionEntry, Directory};

/// Directory reading accounts and dimensions from the report store.
#[derive(Debug, Clone)]
pub struct DbDirectory {
    db: Arc<DatabaseConnection>,
}

impl DbDirectory {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Directory for DbDirectory {
    async fn active_accounts(&self) -> Result<Vec<AccountInfo>> {
        let accounts = repository::list_accounts(self.db.as_ref(), true)
            .await
            .map_err(|e| SyncError::directory(e.to_string()))?;
        Ok(accounts.into_iter().map(AccountInfo::from).collect())
    }

    async fn dimensions(
        &self,
        account_id: &str,
        kind: DimensionKind,
    ) -> Result<Vec<DimensionEntry>> {
        let rows = repository::list_dimensions(self.db.as_ref(), account_id, kind)
            .await
            .map_err(|e| SyncError::directory(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(|row| DimensionEntry {
                parent: row.parent().map(str::to_string),
                value: row.value,
            })
            .collect())
    }
}
