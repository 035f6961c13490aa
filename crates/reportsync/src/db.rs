//! Database connection utilities.

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

/// Pragmas applied to every SQLite connection.
///
/// - `journal_mode=WAL` lets readers proceed while a period is being written
/// - `busy_timeout=5000` waits up to 5 seconds for locks instead of failing
/// - `synchronous=NORMAL` is safe with WAL and faster than FULL
const SQLITE_PRAGMAS: [&str; 3] = [
    "PRAGMA journal_mode=WAL",
    "PRAGMA busy_timeout=5000",
    "PRAGMA synchronous=NORMAL",
];

fn is_sqlite_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite:")
}

async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in SQLITE_PRAGMAS {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }
    Ok(())
}

/// Establish a connection to the report store.
///
/// SQLite connections get WAL journaling, a 5 second busy timeout and
/// `synchronous=NORMAL`.
///
/// # Arguments
/// * `database_url` - Database connection string (e.g., `sqlite:///path/to/reports.db?mode=rwc`
///   or `postgres:///reportsync`)
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    if is_sqlite_url(database_url) {
        configure_sqlite(&db).await?;
    }

    tracing::debug!(backend = ?db.get_database_backend(), "Connected to report store");
    Ok(db)
}

/// Establish a connection and bring the schema up to date.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established or migrations fail.
///
/// # Example
/// ```ignore
/// let db = reportsync::connect_and_migrate("sqlite::memory:").await?;
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}
