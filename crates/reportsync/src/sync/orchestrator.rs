//! Task type × account iteration.
//!
//! The orchestrator is the control surface of the engine: run one task for
//! one account, one task for every active account, or every task for every
//! active account. Runs are strictly sequential and one failure never stops
//! the others.

use crate::entity::task_type::TaskType;
use crate::platform::AccountInfo;

use super::context::SyncContext;
use super::error::{Result, SyncError};
use super::progress::SyncProgress;
use super::runner::SyncRunner;
use super::task::{TaskDescriptor, TaskRegistry};
use super::types::{GLOBAL_ACCOUNT_ID, RunOutcome, SyncSummary, TaskSummary};
use super::window;

/// Runs registered tasks against the accounts of the directory.
#[derive(Debug)]
pub struct Orchestrator {
    registry: TaskRegistry,
    ctx: SyncContext,
}

impl Orchestrator {
    pub fn new(registry: TaskRegistry, ctx: SyncContext) -> Self {
        Self { registry, ctx }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Registered task identifiers, in registration order.
    pub fn task_types(&self) -> Vec<TaskType> {
        self.registry.task_types()
    }

    /// Reject bad options before touching the store or the network.
    fn validate(&self) -> Result<()> {
        window::validate(&self.ctx.options().window, self.ctx.today())
    }

    /// Run one task for one active account.
    ///
    /// # Errors
    ///
    /// `Configuration` for an unregistered task, `Validation` for bad window
    /// overrides or an account that is unknown or inactive, `Directory` when
    /// accounts cannot be listed. Run failures are reported in the summary.
    #[tracing::instrument(skip(self), fields(task = %task_type))]
    pub async fn run_task_for_account(
        &self,
        task_type: TaskType,
        account_id: &str,
    ) -> Result<TaskSummary> {
        let descriptor = self.registry.require(task_type)?;
        self.validate()?;

        let account = self
            .active_accounts()
            .await?
            .into_iter()
            .find(|a| a.id == account_id)
            .ok_or_else(|| {
                SyncError::validation(format!(
                    "account {} does not exist or is not active",
                    account_id
                ))
            })?;

        Ok(self.run_accounts(descriptor, std::slice::from_ref(&account)).await)
    }

    /// Run one task for every active account.
    ///
    /// Account-independent tasks run once, with the first active account's
    /// credentials.
    #[tracing::instrument(skip(self), fields(task = %task_type))]
    pub async fn run_task(&self, task_type: TaskType) -> Result<TaskSummary> {
        let descriptor = self.registry.require(task_type)?;
        self.validate()?;

        let accounts = self.active_accounts().await?;
        Ok(self.run_descriptor(descriptor, accounts).await)
    }

    /// Run a task by name, optionally for a single account.
    ///
    /// # Errors
    ///
    /// `Configuration` when the name is not a registered task; otherwise as
    /// [`Orchestrator::run_task`] and [`Orchestrator::run_task_for_account`].
    pub async fn run_named(&self, name: &str, account_id: Option<&str>) -> Result<TaskSummary> {
        let task_type = self.registry.resolve(name)?.task_type;
        match account_id {
            Some(account_id) => self.run_task_for_account(task_type, account_id).await,
            None => self.run_task(task_type).await,
        }
    }

    /// Run every registered task for every active account.
    ///
    /// Never fails: errors that stop a whole task (bad options, unreadable
    /// directory) are recorded as a failed outcome of that task.
    #[tracing::instrument(skip_all, fields(tasks = self.registry.len()))]
    pub async fn run_all(&self) -> SyncSummary {
        let mut summary = SyncSummary::default();

        let accounts = match self.validate() {
            Ok(()) => self.active_accounts().await,
            Err(err) => Err(err),
        };

        match accounts {
            Ok(accounts) => {
                for descriptor in self.registry.iter() {
                    summary.add(self.run_descriptor(descriptor, accounts.clone()).await);
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "Sync aborted before any run");
                let message = err.short_message();
                for task_type in self.registry.task_types() {
                    let mut task = TaskSummary::new(task_type);
                    task.record(RunOutcome::failed(
                        GLOBAL_ACCOUNT_ID,
                        task_type,
                        None,
                        message.clone(),
                    ));
                    summary.add(task);
                }
            }
        }

        tracing::info!(
            success = summary.success_count,
            failed = summary.fail_count,
            records = summary.total_records,
            "Sync finished"
        );
        summary
    }

    async fn active_accounts(&self) -> Result<Vec<AccountInfo>> {
        self.ctx.directory().active_accounts().await
    }

    async fn run_descriptor(
        &self,
        descriptor: &TaskDescriptor,
        accounts: Vec<AccountInfo>,
    ) -> TaskSummary {
        if !descriptor.is_global() {
            return self.run_accounts(descriptor, &accounts).await;
        }

        match accounts.into_iter().next() {
            Some(credential) => {
                self.run_accounts(descriptor, std::slice::from_ref(&credential))
                    .await
            }
            None => {
                let message = format!(
                    "{} needs an active account for credentials, none found",
                    descriptor.task_type
                );
                tracing::warn!("{}", message);
                self.ctx.emit(SyncProgress::Warning { message });
                TaskSummary::new(descriptor.task_type)
            }
        }
    }

    async fn run_accounts(
        &self,
        descriptor: &TaskDescriptor,
        accounts: &[AccountInfo],
    ) -> TaskSummary {
        let task_type = descriptor.task_type;
        self.ctx.emit(SyncProgress::TaskStarted {
            task_type,
            accounts: accounts.len(),
        });

        let runner = SyncRunner::new(&self.ctx, descriptor);
        let mut summary = TaskSummary::new(task_type);
        for account in accounts {
            for outcome in runner.run(account).await {
                summary.record(outcome);
            }
        }

        if let Some(error) = summary.error_message() {
            tracing::warn!(
                task = %task_type,
                failed = summary.fail_count,
                error = %error,
                "Task finished with failures"
            );
        } else {
            tracing::info!(
                task = %task_type,
                runs = summary.success_count,
                records = summary.total_records,
                "Task finished"
            );
        }
        self.ctx.emit(SyncProgress::TaskComplete {
            task_type,
            success_count: summary.success_count,
            fail_count: summary.fail_count,
            total_records: summary.total_records,
        });
        summary
    }
}
