//! Store operations for accounts, cursors and mirrored report rows.
//!
//! Functions take any [`sea_orm::ConnectionTrait`] so they can run either on
//! a plain connection or inside a transaction.

mod accounts;
mod cursor;
mod errors;
mod key;
mod records;

pub use accounts::{
    add_dimension, find_account, list_accounts, list_dimensions, set_account_active,
    upsert_account,
};
pub use cursor::{CursorUpdate, CursorWrite, find_cursor, list_cursors, save_cursor};
pub use errors::{RepositoryError, Result};
pub use key::SyncKey;
pub use records::{
    NewRecord, RecordCounts, archive_period, archive_task, bulk_upsert, count_active,
    count_in_period, find_active, record_counts,
};
#[cfg(test)]
pub(crate) use records::dedupe_last_wins;
