use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::entity::account::{self, Entity as Account};
use crate::entity::account_dimension::{self, Entity as AccountDimension};
use crate::entity::dimension_kind::DimensionKind;

use super::errors::{RepositoryError, Result};

/// Insert an account or update its name and API key.
///
/// Re-registering an account reactivates it.
pub async fn upsert_account<C>(
    db: &C,
    id: &str,
    name: &str,
    api_key: Option<&str>,
) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    if id.trim().is_empty() {
        return Err(RepositoryError::InvalidInput {
            message: "account id must not be empty".to_string(),
        });
    }

    let model = account::ActiveModel {
        id: Set(id.to_string()),
        name: Set(name.to_string()),
        api_key: Set(api_key.map(str::to_string)),
        active: Set(true),
        created_at: Set(Utc::now().fixed_offset()),
    };

    Account::insert(model)
        .on_conflict(
            OnConflict::column(account::Column::Id)
                .update_columns([
                    account::Column::Name,
                    account::Column::ApiKey,
                    account::Column::Active,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    find_account(db, id)
        .await?
        .ok_or_else(|| RepositoryError::account_not_found(id))
}

/// Find an account by its upstream id.
pub async fn find_account<C>(db: &C, id: &str) -> Result<Option<account::Model>>
where
    C: ConnectionTrait,
{
    Ok(Account::find_by_id(id.to_string()).one(db).await?)
}

/// List accounts ordered by id.
pub async fn list_accounts<C>(db: &C, active_only: bool) -> Result<Vec<account::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Account::find();
    if active_only {
        query = query.filter(account::Column::Active.eq(true));
    }
    Ok(query.order_by_asc(account::Column::Id).all(db).await?)
}

/// Activate or deactivate an account.
pub async fn set_account_active<C>(db: &C, id: &str, active: bool) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Account::update_many()
        .col_expr(account::Column::Active, Expr::value(active))
        .filter(account::Column::Id.eq(id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(RepositoryError::account_not_found(id));
    }
    Ok(())
}

/// Register a fan-out dimension for an account.
///
/// Adding a dimension that already exists is a no-op. Returns `true` if a
/// row was inserted.
pub async fn add_dimension<C>(
    db: &C,
    account_id: &str,
    kind: DimensionKind,
    value: &str,
    parent: Option<&str>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    if value.trim().is_empty() {
        return Err(RepositoryError::InvalidInput {
            message: format!("{} value must not be empty", kind),
        });
    }
    if kind == DimensionKind::Currency && parent.is_none_or(|p| p.trim().is_empty()) {
        return Err(RepositoryError::InvalidInput {
            message: "currency dimensions need a parent store".to_string(),
        });
    }

    let model = account_dimension::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(account_id.to_string()),
        kind: Set(kind),
        value: Set(value.to_string()),
        parent: Set(parent.unwrap_or_default().to_string()),
        created_at: Set(Utc::now().fixed_offset()),
    };

    let inserted = AccountDimension::insert(model)
        .on_conflict(
            OnConflict::columns([
                account_dimension::Column::AccountId,
                account_dimension::Column::Kind,
                account_dimension::Column::Value,
                account_dimension::Column::Parent,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(inserted > 0)
}

/// Dimensions of one kind for an account, ordered by parent then value.
pub async fn list_dimensions<C>(
    db: &C,
    account_id: &str,
    kind: DimensionKind,
) -> Result<Vec<account_dimension::Model>>
where
    C: ConnectionTrait,
{
    let rows = AccountDimension::find()
        .filter(account_dimension::Column::AccountId.eq(account_id))
        .filter(account_dimension::Column::Kind.eq(kind))
        .order_by_asc(account_dimension::Column::Parent)
        .order_by_asc(account_dimension::Column::Value)
        .all(db)
        .await?;
    Ok(rows)
}
