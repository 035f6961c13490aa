//! Initial migration to create the reportsync database schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_accounts(manager).await?;
        self.create_account_dimensions(manager).await?;
        self.create_sync_cursors(manager).await?;
        self.create_report_records(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReportRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SyncCursors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountDimensions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_accounts(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::ApiKey).text().null())
                    .col(
                        ColumnDef::new(Accounts::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_account_dimensions(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccountDimensions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountDimensions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AccountDimensions::AccountId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccountDimensions::Kind).string().not_null())
                    .col(ColumnDef::new(AccountDimensions::Value).string().not_null())
                    .col(
                        ColumnDef::new(AccountDimensions::Parent)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(AccountDimensions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_dimensions_account")
                            .from(AccountDimensions::Table, AccountDimensions::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique constraint on (account_id, kind, value, parent)
        manager
            .create_index(
                Index::create()
                    .name("idx_account_dimensions_natural")
                    .table(AccountDimensions::Table)
                    .col(AccountDimensions::AccountId)
                    .col(AccountDimensions::Kind)
                    .col(AccountDimensions::Value)
                    .col(AccountDimensions::Parent)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_sync_cursors(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncCursors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncCursors::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncCursors::AccountId).string().not_null())
                    .col(ColumnDef::new(SyncCursors::TaskType).string().not_null())
                    .col(
                        ColumnDef::new(SyncCursors::DimensionKey)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(SyncCursors::LastEndAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncCursors::LastSyncAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncCursors::LastRecordCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SyncCursors::LastStatus).string().not_null())
                    .col(ColumnDef::new(SyncCursors::LastError).text().null())
                    .to_owned(),
            )
            .await?;

        // Exactly one cursor per (account, task, dimension)
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_cursors_key")
                    .table(SyncCursors::Table)
                    .col(SyncCursors::AccountId)
                    .col(SyncCursors::TaskType)
                    .col(SyncCursors::DimensionKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_report_records(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReportRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReportRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    // Natural key
                    .col(ColumnDef::new(ReportRecords::AccountId).string().not_null())
                    .col(ColumnDef::new(ReportRecords::TaskType).string().not_null())
                    .col(
                        ColumnDef::new(ReportRecords::DimensionKey)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(ReportRecords::RecordKey).string().not_null())
                    // Partitioning
                    .col(
                        ColumnDef::new(ReportRecords::PeriodKey)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    // Content
                    .col(
                        ColumnDef::new(ReportRecords::Payload)
                            .json()
                            .not_null()
                            .default(Expr::cust("'{}'")),
                    )
                    // Tracking
                    .col(
                        ColumnDef::new(ReportRecords::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ReportRecords::FirstSeenAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ReportRecords::SyncedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Upsert target: (account, task, dimension, record_key)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_records_natural")
                    .table(ReportRecords::Table)
                    .col(ReportRecords::AccountId)
                    .col(ReportRecords::TaskType)
                    .col(ReportRecords::DimensionKey)
                    .col(ReportRecords::RecordKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Period overwrite lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_report_records_period")
                    .table(ReportRecords::Table)
                    .col(ReportRecords::AccountId)
                    .col(ReportRecords::TaskType)
                    .col(ReportRecords::DimensionKey)
                    .col(ReportRecords::PeriodKey)
                    .to_owned(),
            )
            .await?;

        // Index on archived
        manager
            .create_index(
                Index::create()
                    .name("idx_report_records_archived")
                    .table(ReportRecords::Table)
                    .col(ReportRecords::Archived)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Name,
    ApiKey,
    Active,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AccountDimensions {
    Table,
    Id,
    AccountId,
    Kind,
    Value,
    Parent,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SyncCursors {
    Table,
    Id,
    AccountId,
    TaskType,
    DimensionKey,
    LastEndAt,
    LastSyncAt,
    LastRecordCount,
    LastStatus,
    LastError,
}

#[derive(DeriveIden)]
enum ReportRecords {
    Table,
    Id,
    AccountId,
    TaskType,
    DimensionKey,
    RecordKey,
    PeriodKey,
    Payload,
    Archived,
    FirstSeenAt,
    SyncedAt,
}
