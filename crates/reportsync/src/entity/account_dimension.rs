//! AccountDimension entity - sub-entities (stores, sellers, shops, currencies)
//! an account exposes to fan-out tasks.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::dimension_kind::DimensionKind;

/// AccountDimension model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account_dimensions")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning account.
    pub account_id: String,

    /// What this dimension represents.
    pub kind: DimensionKind,

    /// Upstream identifier (store id, seller id, shop name, currency code).
    pub value: String,

    /// Parent value for nested dimensions (the store of a currency).
    /// Empty when the dimension has no parent.
    #[sea_orm(default_value = "")]
    pub parent: String,

    /// When this dimension was registered.
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A dimension belongs to an account.
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parent value, if any.
    pub fn parent(&self) -> Option<&str> {
        if self.parent.is_empty() {
            None
        } else {
            Some(&self.parent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parent_treats_empty_as_none() {
        let mut model = Model {
            id: Uuid::new_v4(),
            account_id: "acct-1".to_string(),
            kind: DimensionKind::Currency,
            value: "USD".to_string(),
            parent: String::new(),
            created_at: Utc::now().fixed_offset(),
        };
        assert_eq!(model.parent(), None);

        model.parent = "store-9".to_string();
        assert_eq!(model.parent(), Some("store-9"));
    }
}
