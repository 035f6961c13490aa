use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of the most recent run for a cursor key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Every planned period completed.
    #[sea_orm(string_value = "success")]
    Success,
    /// Some periods completed, at least one failed or was partially fetched.
    #[sea_orm(string_value = "partial")]
    Partial,
    /// Nothing completed.
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl SyncStatus {
    /// Derive the status from completed and failed unit counts.
    pub fn from_counts(completed: usize, failed: usize) -> Self {
        match (completed, failed) {
            (_, 0) => SyncStatus::Success,
            (0, _) => SyncStatus::Failed,
            _ => SyncStatus::Partial,
        }
    }

    /// Fold the statuses of several runs into one.
    ///
    /// A partial run counts both as progress and as a failure.
    pub fn combine(statuses: impl IntoIterator<Item = SyncStatus>) -> Self {
        let (mut completed, mut failed) = (0, 0);
        for status in statuses {
            match status {
                SyncStatus::Success => completed += 1,
                SyncStatus::Failed => failed += 1,
                SyncStatus::Partial => {
                    completed += 1;
                    failed += 1;
                }
            }
        }
        Self::from_counts(completed, failed)
    }

    pub fn is_success(self) -> bool {
        matches!(self, SyncStatus::Success)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Success => write!(f, "success"),
            SyncStatus::Partial => write!(f, "partial"),
            SyncStatus::Failed => write!(f, "failed"),
        }
    }
}
