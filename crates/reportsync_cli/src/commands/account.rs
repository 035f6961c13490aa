//! Account management commands.
//!
//! Accounts and their dimensions (stores, sellers, shops, currencies) are the
//! directory the sync engine iterates over.

use clap::Subcommand;
use console::style;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tabled::Tabled;

use reportsync::entity::account;
use reportsync::entity::dimension_kind::DimensionKind;
use reportsync::repository;

use super::output::{OutputFormat, or_dash, render};

/// Account management subcommands.
#[derive(Subcommand)]
pub enum AccountAction {
    /// Add an account, or update its name and API key
    Add {
        /// Account identifier used by the upstream API
        id: String,

        /// Display name (defaults to the id)
        #[arg(short, long)]
        name: Option<String>,

        /// API key sent as bearer token
        #[arg(short = 'k', long, env = "REPORTSYNC_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
    /// List accounts
    List {
        /// Include deactivated accounts
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Register a store, seller, shop or currency for an account
    DimensionAdd {
        /// Account identifier
        account: String,

        /// Dimension kind (store, seller, shop, currency)
        kind: DimensionKind,

        /// Dimension value (store id, seller id, shop name, currency code)
        value: String,

        /// Owning store, for currencies
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Exclude an account from future runs
    Disable {
        /// Account identifier
        id: String,
    },
    /// Include a previously disabled account again
    Enable {
        /// Account identifier
        id: String,
    },
}

/// Display struct for account listing.
#[derive(Debug, Clone, Serialize, Tabled)]
struct AccountDisplay {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "API Key")]
    api_key: String,
    #[tabled(rename = "Active")]
    active: bool,
    #[tabled(rename = "Created")]
    created_at: String,
}

impl From<&account::Model> for AccountDisplay {
    fn from(account: &account::Model) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            api_key: mask_key(account.api_key.as_deref()),
            active: account.active,
            created_at: account.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Show only the last four characters of an API key.
fn mask_key(key: Option<&str>) -> String {
    match key {
        Some(key) if key.chars().count() > 4 => {
            let tail: String = key.chars().skip(key.chars().count() - 4).collect();
            format!("****{}", tail)
        }
        Some(key) if !key.is_empty() => "****".to_string(),
        _ => or_dash(None),
    }
}

/// Handle account management commands.
pub async fn handle_account(
    action: AccountAction,
    db: &DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AccountAction::Add { id, name, api_key } => {
            let name = name.unwrap_or_else(|| id.clone());
            let account = repository::upsert_account(db, &id, &name, api_key.as_deref()).await?;
            println!(
                "{} Saved account '{}' ({})",
                style("✓").green().bold(),
                style(&account.id).cyan(),
                account.name
            );
            if account.api_key.is_none() {
                println!(
                    "  {} no API key set; runs for this account will fail authentication",
                    style("Warning:").yellow().bold()
                );
            }
        }
        AccountAction::List { all, output } => {
            list_accounts(db, !all, output).await?;
        }
        AccountAction::DimensionAdd {
            account,
            kind,
            value,
            parent,
        } => {
            let added =
                repository::add_dimension(db, &account, kind, &value, parent.as_deref()).await?;
            if added {
                println!(
                    "{} Added {} '{}' to account '{}'",
                    style("✓").green().bold(),
                    kind,
                    style(&value).cyan(),
                    account
                );
            } else {
                println!("{} '{}' is already registered for '{}'", kind, value, account);
            }
        }
        AccountAction::Disable { id } => {
            repository::set_account_active(db, &id, false).await?;
            println!("{} Disabled account '{}'", style("✓").green().bold(), id);
        }
        AccountAction::Enable { id } => {
            repository::set_account_active(db, &id, true).await?;
            println!("{} Enabled account '{}'", style("✓").green().bold(), id);
        }
    }
    Ok(())
}

async fn list_accounts(
    db: &DatabaseConnection,
    active_only: bool,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let accounts = repository::list_accounts(db, active_only).await?;

    if accounts.is_empty() && output == OutputFormat::Table {
        println!("No accounts configured.");
        println!();
        println!("Add an account with:");
        println!("  reportsync account add <id> --name <name> --api-key <key>");
        return Ok(());
    }

    let displays: Vec<AccountDisplay> = accounts.iter().map(AccountDisplay::from).collect();
    println!("{}", render(&displays, output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key(None), "-");
        assert_eq!(mask_key(Some("")), "-");
        assert_eq!(mask_key(Some("abc")), "****");
        assert_eq!(mask_key(Some("sk-123456789")), "****6789");
    }
}
