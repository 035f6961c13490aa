//! Account entity - one tenant of the upstream reporting API.
//!
//! Accounts are owned by the directory: the sync engine only reads them. The
//! `id` is the upstream account identifier, so it doubles as the natural key
//! in the cursor and record tables.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account model - an external tenant whose reports are mirrored locally.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Upstream account identifier.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Human-readable account name.
    pub name: String,

    /// API key used to authenticate requests on behalf of this account.
    #[sea_orm(column_type = "Text", nullable)]
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Inactive accounts are skipped by the orchestrator.
    #[sea_orm(default_value = true)]
    pub active: bool,

    /// When this account was first registered.
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// An account has many fan-out dimensions.
    #[sea_orm(has_many = "super::account_dimension::Entity")]
    Dimensions,
}

impl Related<super::account_dimension::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dimensions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
