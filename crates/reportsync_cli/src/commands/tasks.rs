use serde::Serialize;
use tabled::Tabled;

use reportsync::sync::{TaskDescriptor, TaskRegistry, TaskScope};

use super::output::{OutputFormat, render};

/// One registered task, as listed by `reportsync tasks`.
#[derive(Debug, Clone, Serialize, Tabled)]
struct TaskDisplay {
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Granularity")]
    granularity: String,
    #[tabled(rename = "Lookback")]
    lookback: String,
    #[tabled(rename = "Max Span")]
    max_span: String,
    #[tabled(rename = "Persistence")]
    persistence: String,
    #[tabled(rename = "Fan-out")]
    fanout: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Page Size")]
    page_size: u32,
}

impl From<&TaskDescriptor> for TaskDisplay {
    fn from(task: &TaskDescriptor) -> Self {
        let lookback = if task.granularity.is_windowed() {
            format!("{} {}", task.default_lookback, task.granularity)
        } else {
            "-".to_string()
        };
        Self {
            task: task.task_type.to_string(),
            granularity: task.granularity.to_string(),
            lookback,
            max_span: task
                .max_span_days
                .map(|days| format!("{}d", days))
                .unwrap_or_else(|| "-".to_string()),
            persistence: task.persistence.to_string(),
            fanout: task.fanout.to_string(),
            scope: match task.scope {
                TaskScope::Account => "account".to_string(),
                TaskScope::Global => "global".to_string(),
            },
            page_size: task.page_size,
        }
    }
}

/// List the registered tasks.
pub(crate) fn handle_tasks(
    registry: &TaskRegistry,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let rows: Vec<TaskDisplay> = registry.iter().map(TaskDisplay::from).collect();
    println!("{}", render(&rows, output)?);
    Ok(())
}
