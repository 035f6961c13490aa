use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reportsync::entity::task_type::TaskType;
use reportsync::sync::SyncProgress;

use super::target_label;

/// Bar state for one task.
struct TaskBar {
    bar: ProgressBar,
    /// Periods planned across all runs of the task so far.
    planned: u64,
    done: bool,
}

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    tasks: HashMap<TaskType, TaskBar>,
}

/// Interactive progress reporter using indicatif.
///
/// Each task starts as a spinner and turns into a bar once its first run
/// has been planned. The bar length grows with every planned run.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    /// A reporter that draws nothing.
    #[cfg(test)]
    pub(crate) fn hidden() -> Self {
        Self::with_multi(MultiProgress::with_draw_target(
            indicatif::ProgressDrawTarget::hidden(),
        ))
    }

    fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn task_bar(&self, state: &mut ProgressState, task_type: TaskType) -> ProgressBar {
        state
            .tasks
            .entry(task_type)
            .or_insert_with(|| {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(Self::spinner_style());
                bar.set_prefix(format!("{:20}", task_type));
                bar.enable_steady_tick(Duration::from_millis(100));
                TaskBar {
                    bar,
                    planned: 0,
                    done: false,
                }
            })
            .bar
            .clone()
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::TaskStarted {
                task_type,
                accounts,
            } => {
                let bar = self.task_bar(&mut state, task_type);
                bar.set_message(format!("Starting ({} accounts)...", accounts));
            }

            SyncProgress::RunPlanned {
                account_id,
                task_type,
                dimension,
                periods,
                window,
            } => {
                let bar = self.task_bar(&mut state, task_type);
                if let Some(task) = state.tasks.get_mut(&task_type) {
                    if task.planned == 0 {
                        bar.disable_steady_tick();
                        bar.set_style(Self::bar_style());
                        bar.set_position(0);
                    }
                    task.planned += periods as u64;
                    bar.set_length(task.planned);
                }
                bar.set_message(format!(
                    "{} {}",
                    target_label(&account_id, dimension.as_deref()),
                    window
                ));
            }

            SyncProgress::FetchingPeriod {
                account_id,
                task_type,
                dimension,
                period,
                ..
            } => {
                if let Some(task) = state.tasks.get(&task_type) {
                    let label = target_label(&account_id, dimension.as_deref());
                    let message = if period.is_empty() {
                        format!("{} fetching...", label)
                    } else {
                        format!("{} {}", label, period)
                    };
                    task.bar.set_message(message);
                }
            }

            SyncProgress::FetchedPage {
                task_type,
                period,
                page,
                total_so_far,
                expected_total,
                ..
            } => {
                if let Some(task) = state.tasks.get(&task_type) {
                    let of = expected_total
                        .map(|total| format!("/{}", total))
                        .unwrap_or_default();
                    task.bar.set_message(format!(
                        "{} page {} ({}{} records)",
                        period, page, total_so_far, of
                    ));
                }
            }

            SyncProgress::PersistedPeriod {
                task_type,
                period,
                records,
                complete,
                ..
            } => {
                if let Some(task) = state.tasks.get(&task_type) {
                    task.bar.inc(1);
                    let symbol = if complete { "✓" } else { "◐" };
                    task.bar
                        .set_message(format!("{} {} ({} records)", symbol, period, records));
                }
            }

            SyncProgress::PeriodFailed {
                task_type,
                period,
                error,
            } => {
                if let Some(task) = state.tasks.get(&task_type) {
                    task.bar.inc(1);
                    task.bar.set_message(format!("✗ {}: {}", period, error));
                }
            }

            SyncProgress::RunSkipped {
                account_id,
                task_type,
                dimension,
            } => {
                if let Some(task) = state.tasks.get(&task_type) {
                    task.bar.set_message(format!(
                        "{} up to date",
                        target_label(&account_id, dimension.as_deref())
                    ));
                }
            }

            SyncProgress::NoDimensions {
                account_id,
                task_type,
            } => {
                drop(state);
                self.multi
                    .println(format!(
                        "· {} {}: no dimensions registered",
                        task_type, account_id
                    ))
                    .ok();
            }

            SyncProgress::Archived {
                account_id,
                task_type,
                rows,
            } => {
                drop(state);
                self.multi
                    .println(format!(
                        "· {} {}: archived {} rows for full resync",
                        task_type, account_id, rows
                    ))
                    .ok();
            }

            SyncProgress::RunComplete {
                account_id,
                task_type,
                dimension,
                success,
                error,
                ..
            } => {
                drop(state);
                if !success {
                    self.multi
                        .println(format!(
                            "✗ {} {}: {}",
                            task_type,
                            target_label(&account_id, dimension.as_deref()),
                            error.unwrap_or_else(|| "failed".to_string())
                        ))
                        .ok();
                }
            }

            SyncProgress::TaskComplete {
                task_type,
                success_count,
                fail_count,
                total_records,
            } => {
                let bar = self.task_bar(&mut state, task_type);
                if let Some(task) = state.tasks.get_mut(&task_type) {
                    task.done = true;
                }
                let msg = if fail_count > 0 {
                    format!(
                        "✗ {} runs ok, {} failed, {} records",
                        success_count, fail_count, total_records
                    )
                } else {
                    format!("✓ {} runs, {} records", success_count, total_records)
                };
                bar.finish_with_message(msg);
            }

            SyncProgress::Warning { message } => {
                drop(state);
                self.multi.println(format!("⚠ {}", message)).ok();
            }

            _ => {}
        }
    }

    /// Finish all progress bars.
    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for task in state.tasks.values() {
            if !task.bar.is_finished() {
                task.bar.finish();
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn position(&self, task_type: TaskType) -> Option<(u64, Option<u64>)> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .tasks
            .get(&task_type)
            .map(|task| (task.bar.position(), task.bar.length()))
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self, task_type: TaskType) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .tasks
            .get(&task_type)
            .is_some_and(|task| task.done && task.bar.is_finished())
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
