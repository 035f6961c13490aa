//! Task type enum identifying every report/entity type the engine can mirror.
//!
//! The set is closed: each variant is bound to exactly one handler in the
//! task registry, and the string value is what gets stored in the cursor and
//! record tables.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report/entity types mirrored from the upstream reporting API.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Orders placed per store, keyed by order id.
    #[sea_orm(string_value = "orders")]
    Orders,
    /// Daily settlement ledger per store and currency.
    #[sea_orm(string_value = "settlement_summary")]
    SettlementSummary,
    /// Monthly profit report per seller.
    #[sea_orm(string_value = "profit_report")]
    ProfitReport,
    /// Daily advertising spend per shop.
    #[sea_orm(string_value = "ad_spend")]
    AdSpend,
    /// Current inventory snapshot per store.
    #[sea_orm(string_value = "inventory")]
    Inventory,
    /// Product listings of the whole account.
    #[sea_orm(string_value = "listings")]
    Listings,
    /// Exchange rate reference table, shared by all accounts.
    #[sea_orm(string_value = "exchange_rates")]
    ExchangeRates,
}

impl TaskType {
    /// Every task type, in registration order.
    pub const ALL: [TaskType; 7] = [
        TaskType::Orders,
        TaskType::SettlementSummary,
        TaskType::ProfitReport,
        TaskType::AdSpend,
        TaskType::Inventory,
        TaskType::Listings,
        TaskType::ExchangeRates,
    ];

    /// Stable identifier used in storage, logs and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Orders => "orders",
            TaskType::SettlementSummary => "settlement_summary",
            TaskType::ProfitReport => "profit_report",
            TaskType::AdSpend => "ad_spend",
            TaskType::Inventory => "inventory",
            TaskType::Listings => "listings",
            TaskType::ExchangeRates => "exchange_rates",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        TaskType::ALL
            .into_iter()
            .find(|task| task.as_str() == normalized)
            .ok_or_else(|| format!("Unknown task type: {}", s))
    }
}
