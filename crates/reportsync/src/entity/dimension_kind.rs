use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of sub-entity an account exposes to fan-out tasks.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    /// Marketplace store (storefront id).
    #[sea_orm(string_value = "store")]
    Store,
    /// Seller identity within the account.
    #[sea_orm(string_value = "seller")]
    Seller,
    /// Shop name used by advertising endpoints.
    #[sea_orm(string_value = "shop")]
    Shop,
    /// Settlement currency; its parent is the owning store.
    #[sea_orm(string_value = "currency")]
    Currency,
}

impl DimensionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DimensionKind::Store => "store",
            DimensionKind::Seller => "seller",
            DimensionKind::Shop => "shop",
            DimensionKind::Currency => "currency",
        }
    }
}

impl std::fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DimensionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "store" | "sid" => Ok(DimensionKind::Store),
            "seller" => Ok(DimensionKind::Seller),
            "shop" => Ok(DimensionKind::Shop),
            "currency" => Ok(DimensionKind::Currency),
            _ => Err(format!("Unknown dimension kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for kind in [
            DimensionKind::Store,
            DimensionKind::Seller,
            DimensionKind::Shop,
            DimensionKind::Currency,
        ] {
            assert_eq!(kind.to_string().parse::<DimensionKind>().unwrap(), kind);
        }
        assert_eq!("sid".parse::<DimensionKind>().unwrap(), DimensionKind::Store);
        assert!("region".parse::<DimensionKind>().is_err());
    }
}
