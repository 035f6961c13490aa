//! Ctrl+C handling for long runs.
//!
//! Every period is committed on its own, so dropping a run mid-flight loses
//! at most the period in progress and its cursor update. The next run
//! replans from the last saved cursor.

use console::Term;

/// Resolves on the first Ctrl+C.
///
/// A second Ctrl+C while shutting down exits immediately.
pub(crate) async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Unable to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }

    if Term::stdout().is_term() {
        eprintln!("\n\nShutdown requested, stopping after the current request...");
        eprintln!("Press Ctrl+C again to force quit.");
    } else {
        tracing::warn!("Shutdown requested");
    }

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}
