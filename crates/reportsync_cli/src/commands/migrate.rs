//! Schema management.

use console::style;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tabled::Tabled;

use reportsync::db;
use reportsync::migration::{Migrator, MigratorTrait};

use super::output::{OutputFormat, render};
use crate::MigrateAction;

#[derive(Debug, Clone, Serialize, Tabled)]
struct MigrationDisplay {
    #[tabled(rename = "Migration")]
    name: String,
    #[tabled(rename = "State")]
    state: &'static str,
}

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            if pending == 0 {
                println!("Schema is up to date.");
                return Ok(());
            }
            Migrator::up(&db, None).await?;
            println!(
                "{} Applied {} migration(s)",
                style("✓").green().bold(),
                pending
            );
        }
        MigrateAction::Down => {
            if Migrator::get_applied_migrations(&db).await?.is_empty() {
                println!("Nothing to roll back.");
                return Ok(());
            }
            Migrator::down(&db, Some(1)).await?;
            println!("{} Rolled back one migration", style("✓").green().bold());
        }
        MigrateAction::Status => print_status(&db).await?,
        MigrateAction::Fresh => {
            println!(
                "{} dropping every table, including stored reports and cursors",
                style("Warning:").yellow().bold()
            );
            Migrator::fresh(&db).await?;
            println!("{} Schema recreated", style("✓").green().bold());
        }
    }

    Ok(())
}

async fn print_status(db: &DatabaseConnection) -> Result<(), Box<dyn std::error::Error>> {
    let applied = Migrator::get_applied_migrations(db).await?;
    let pending = Migrator::get_pending_migrations(db).await?;

    let rows: Vec<MigrationDisplay> = applied
        .iter()
        .map(|m| MigrationDisplay {
            name: m.name().to_string(),
            state: "applied",
        })
        .chain(pending.iter().map(|m| MigrationDisplay {
            name: m.name().to_string(),
            state: "pending",
        }))
        .collect();

    println!("{}", render(&rows, OutputFormat::Table)?);
    Ok(())
}
