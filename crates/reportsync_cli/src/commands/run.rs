//! The `run` command: plan, fetch and persist.

use std::sync::Arc;

use chrono::Utc;
use console::style;
use serde::Serialize;
use tabled::Tabled;

use reportsync::http::HttpReportClient;
use reportsync::http::reqwest_transport::ReqwestTransport;
use reportsync::sync::{
    Orchestrator, PacingStrategy, PaginationConfig, RunOutcome, SyncContext, SyncMode,
    SyncOptions, SyncSummary, TaskRegistry, window,
};
use reportsync::{RateLimitedClient, ReportClient, db};

use super::output::{OutputFormat, or_dash, render};
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::shutdown;

/// Options of `reportsync run`.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RunArgs {
    /// Only run this task (see `reportsync tasks`)
    #[arg(short, long)]
    task: Option<String>,

    /// Only run for this account
    #[arg(short, long)]
    account: Option<String>,

    /// Ignore stored cursors and replan from each task's default lookback;
    /// snapshot tasks archive their collection before rewriting it
    #[arg(long)]
    full: bool,

    /// First day to fetch (YYYY-MM-DD); overrides cursor and lookback
    #[arg(long)]
    from: Option<String>,

    /// Last day to fetch (YYYY-MM-DD); defaults to today (UTC)
    #[arg(long)]
    to: Option<String>,

    /// API base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Pacing strategy: fixed, token-bucket or none (overrides config)
    #[arg(long)]
    pacing: Option<PacingStrategy>,

    /// Delay between requests for fixed pacing, in milliseconds
    #[arg(long)]
    pacing_ms: Option<u64>,

    /// Lower every task's page size to at most this many records
    #[arg(long)]
    page_size_cap: Option<u32>,

    /// Output format for the run summary
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

impl RunArgs {
    fn mode(&self) -> SyncMode {
        if self.full {
            SyncMode::Full
        } else {
            SyncMode::Incremental
        }
    }
}

/// One run outcome, flattened for display.
#[derive(Debug, Clone, Serialize, Tabled)]
struct OutcomeDisplay {
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Dimension")]
    dimension: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Records")]
    records: u64,
    #[tabled(rename = "Error")]
    error: String,
}

impl From<&RunOutcome> for OutcomeDisplay {
    fn from(outcome: &RunOutcome) -> Self {
        let status = if outcome.skipped {
            "up to date".to_string()
        } else {
            outcome.status.to_string()
        };
        Self {
            task: outcome.task_type.to_string(),
            account: outcome.account_id.clone(),
            dimension: or_dash(outcome.dimension_key.as_deref()),
            status,
            records: outcome.record_count,
            error: or_dash(outcome.error.as_deref()),
        }
    }
}

/// Handle the run command.
///
/// Returns `Ok(false)` when at least one run failed.
pub(crate) async fn handle_run(
    args: RunArgs,
    registry: TaskRegistry,
    config: &Config,
    database_url: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    // Reject bad requests before touching the store or the network.
    if let Some(name) = &args.task {
        registry.resolve(name)?;
    }
    let window = window::parse_overrides(args.from.as_deref(), args.to.as_deref())?;
    window::validate(&window, Utc::now().date_naive())?;

    let base_url = args
        .base_url
        .clone()
        .or_else(|| config.api.base_url.clone())
        .ok_or(
            "No API base URL configured. Set [api] base_url in the config file, \
             REPORTSYNC_API__BASE_URL, or pass --base-url",
        )?;

    let options = SyncOptions {
        mode: args.mode(),
        window,
        pagination: PaginationConfig {
            page_size_cap: args.page_size_cap.or(config.sync.page_size_cap),
            ..PaginationConfig::default()
        },
        pacing: config.pacing(args.pacing, args.pacing_ms),
    };

    let db = db::connect_and_migrate(database_url).await?;

    let transport = ReqwestTransport::with_timeout(config.request_timeout())?;
    let client: Arc<dyn ReportClient> = Arc::new(RateLimitedClient::new(
        HttpReportClient::new(transport, base_url),
        config.api.requests_per_second,
    ));

    let reporter = Arc::new(ProgressReporter::new());
    let ctx = SyncContext::builder()
        .client(client)
        .database(Arc::new(db))
        .options(options)
        .progress(reporter.as_callback())
        .build()?;
    let orchestrator = Orchestrator::new(registry, ctx);

    let summary = tokio::select! {
        summary = execute(&orchestrator, &args) => summary,
        () = shutdown::interrupted() => {
            reporter.finish();
            return Err("Interrupted. Stored periods are kept; the next run resumes from the saved cursors.".into());
        }
    };
    reporter.finish();
    let summary = summary?;

    print_summary(&summary, args.output, reporter.is_interactive())?;
    Ok(summary.success())
}

async fn execute(
    orchestrator: &Orchestrator,
    args: &RunArgs,
) -> Result<SyncSummary, Box<dyn std::error::Error>> {
    let mut summary = SyncSummary::default();
    match (&args.task, &args.account) {
        (None, None) => return Ok(orchestrator.run_all().await),
        (Some(task), account) => {
            summary.add(orchestrator.run_named(task, account.as_deref()).await?);
        }
        (None, Some(account)) => {
            for task_type in orchestrator.task_types() {
                summary.add(orchestrator.run_task_for_account(task_type, account).await?);
            }
        }
    }
    Ok(summary)
}

fn print_summary(
    summary: &SyncSummary,
    output: OutputFormat,
    is_tty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let rows: Vec<OutcomeDisplay> = summary
        .tasks
        .iter()
        .flat_map(|task| task.outcomes.iter())
        .map(OutcomeDisplay::from)
        .collect();

    if !rows.is_empty() {
        println!("{}", render(&rows, output)?);
    }

    if is_tty {
        let mark = if summary.success() {
            style("✓").green().bold()
        } else {
            style("✗").red().bold()
        };
        println!(
            "{} {} runs succeeded, {} failed, {} records written",
            mark, summary.success_count, summary.fail_count, summary.total_records
        );
    } else {
        tracing::info!(
            success = summary.success_count,
            failed = summary.fail_count,
            records = summary.total_records,
            "Run summary"
        );
    }
    Ok(())
}
