//! reportsync CLI - command-line interface for the report mirror.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use reportsync::entity::task_type::TaskType;
use reportsync::sync::default_registry;

use crate::commands::account::AccountAction;
use crate::commands::output::OutputFormat;
use crate::commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "reportsync")]
#[command(version)]
#[command(about = "Mirror a paginated, rate-limited reporting API into a local database")]
#[command(
    long_about = "reportsync keeps a local copy of reports (orders, settlements, profit, \
advertising spend, inventory, listings, exchange rates) in step with the upstream API. \
Each run picks up where the previous one stopped, and re-running a window never \
duplicates data."
)]
#[command(after_long_help = r#"EXAMPLES
    Register an account and its stores:
        $ reportsync account add acct-1 --name "Main" --api-key "$KEY"
        $ reportsync account dimension-add acct-1 store 12
        $ reportsync account dimension-add acct-1 currency EUR --parent 12

    Run every task for every active account:
        $ reportsync run

    Re-fetch one task for a fixed range:
        $ reportsync run --task orders --from 2024-03-01 --to 2024-03-10

    Inspect how far each task has been synchronized:
        $ reportsync cursors --account acct-1

CONFIGURATION
    reportsync reads configuration from:
      1. ~/.config/reportsync/config.toml (or $XDG_CONFIG_HOME/reportsync/config.toml)
      2. ./reportsync.toml
      3. Environment variables (REPORTSYNC_ prefix, `__` between section and key)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    REPORTSYNC_DATABASE__URL          Database connection string (default: ~/.local/state/reportsync/reports.db)
    REPORTSYNC_API__BASE_URL          Upstream API base URL
    REPORTSYNC_API__TIMEOUT_SECS      Per-request timeout (default: 30)
    REPORTSYNC_API__REQUESTS_PER_SECOND  Client-side request budget (default: 5)
    REPORTSYNC_SYNC__PACING           fixed | token_bucket | none (default: fixed)
    REPORTSYNC_SYNC__PACING_MS        Delay for fixed pacing (default: 500)
    REPORTSYNC_SYNC__PAGE_SIZE_CAP    Upper bound on every task's page size
"#)]
struct Cli {
    /// Database URL (overrides config and environment)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// List the registered report tasks
    Tasks {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Manage accounts and their stores, sellers, shops and currencies
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Synchronize reports
    Run(RunArgs),
    /// Show stored cursors and row counts
    Cursors {
        /// Only this account
        #[arg(short, long)]
        account: Option<String>,

        /// Only this task
        #[arg(short, long)]
        task: Option<TaskType>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

/// Create the parent directory of a SQLite database file.
fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging when not attached to a terminal; progress bars otherwise.
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("reportsync=info,reportsync_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();
    let cli = Cli::parse();

    // Commands that don't need the database.
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Tasks { output } => {
            commands::tasks::handle_tasks(&default_registry()?, *output)?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let database_url = cli
        .database_url
        .clone()
        .or_else(|| config.database_url())
        .ok_or("Could not determine a database URL; set [database] url in the config file")?;
    ensure_sqlite_dir(&database_url)?;

    match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Account { action } => {
            let db = reportsync::connect_and_migrate(&database_url).await?;
            commands::account::handle_account(action, &db).await?;
        }
        Commands::Run(args) => {
            let succeeded =
                commands::run::handle_run(args, default_registry()?, &config, &database_url)
                    .await?;
            if !succeeded {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Cursors {
            account,
            task,
            output,
        } => {
            let db = reportsync::connect_and_migrate(&database_url).await?;
            commands::cursors::handle_cursors(&db, account.as_deref(), task, output).await?;
        }
        Commands::Completions { .. } | Commands::Man { .. } | Commands::Tasks { .. } => {}
    }

    Ok(ExitCode::SUCCESS)
}
