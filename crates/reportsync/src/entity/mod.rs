//! SeaORM entity definitions for the reportsync database schema.

pub mod account;
pub mod account_dimension;
pub mod dimension_kind;
pub mod prelude;
pub mod report_record;
pub mod sync_cursor;
pub mod sync_status;
pub mod task_type;
