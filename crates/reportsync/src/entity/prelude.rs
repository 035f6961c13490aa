//! Common re-exports for convenient entity usage.

pub use super::account::{
    ActiveModel as AccountActiveModel, Column as AccountColumn, Entity as Account,
    Model as AccountModel,
};
pub use super::account_dimension::{
    ActiveModel as AccountDimensionActiveModel, Column as AccountDimensionColumn,
    Entity as AccountDimension, Model as AccountDimensionModel,
};
pub use super::dimension_kind::DimensionKind;
pub use super::report_record::{
    ActiveModel as ReportRecordActiveModel, Column as ReportRecordColumn,
    Entity as ReportRecord, Model as ReportRecordModel,
};
pub use super::sync_cursor::{
    ActiveModel as SyncCursorActiveModel, Column as SyncCursorColumn, Entity as SyncCursor,
    Model as SyncCursorModel,
};
pub use super::sync_status::SyncStatus;
pub use super::task_type::TaskType;
