//! Task descriptors and the registration table.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::entity::task_type::TaskType;
use crate::platform::{AccountInfo, PlatformError, ReportClient};

use super::fanout::{Dimension, FanoutKind};
use super::pagination::Page;
use super::period::{DateRange, Granularity};

/// Default page size when a task does not document one.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// How fetched rows are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceMode {
    /// Upsert on the record's natural key.
    UpsertByKey,
    /// Archive the stored period, then write the fresh rows.
    OverwriteByPeriod,
    /// Upsert on the natural key; full runs archive the collection first.
    ArchiveThenFullResync,
}

impl PersistenceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PersistenceMode::UpsertByKey => "upsert_by_key",
            PersistenceMode::OverwriteByPeriod => "overwrite_by_period",
            PersistenceMode::ArchiveThenFullResync => "archive_then_full_resync",
        }
    }
}

impl std::fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a task's data belongs to an account or to nobody in particular.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskScope {
    #[default]
    Account,
    /// Reference data shared by all accounts; fetched once per invocation.
    Global,
}

/// Parameters of one page fetch.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub account: &'a AccountInfo,
    pub dimension: Option<&'a Dimension>,
    /// Date range of the request; `None` for snapshot tasks.
    pub range: Option<DateRange>,
    pub offset: u64,
    pub length: u32,
}

/// Fetch logic of one task.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Fetch one page.
    async fn fetch_page(
        &self,
        client: &dyn ReportClient,
        request: &PageRequest<'_>,
    ) -> Result<Page, PlatformError>;

    /// Natural key of a record, if it has one.
    fn natural_key(&self, record: &Value) -> Option<String>;
}

/// Static description of a task.
#[derive(Clone)]
pub struct TaskDescriptor {
    pub task_type: TaskType,
    pub handler: Arc<dyn TaskHandler>,
    pub granularity: Granularity,
    /// Lookback in granularity units for cold starts and full runs.
    pub default_lookback: u32,
    pub max_span_days: Option<u32>,
    pub persistence: PersistenceMode,
    pub fanout: FanoutKind,
    pub scope: TaskScope,
    /// Collections archived before a full resync.
    pub archive_targets: Vec<TaskType>,
    /// Documented maximum page size of the endpoint.
    pub page_size: u32,
}

impl std::fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("task_type", &self.task_type)
            .field("granularity", &self.granularity)
            .field("default_lookback", &self.default_lookback)
            .field("max_span_days", &self.max_span_days)
            .field("persistence", &self.persistence)
            .field("fanout", &self.fanout)
            .field("scope", &self.scope)
            .field("archive_targets", &self.archive_targets)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl TaskDescriptor {
    /// Start describing a task.
    pub fn builder(task_type: TaskType, handler: Arc<dyn TaskHandler>) -> TaskDescriptorBuilder {
        TaskDescriptorBuilder {
            descriptor: TaskDescriptor {
                task_type,
                handler,
                granularity: Granularity::Day,
                default_lookback: 30,
                max_span_days: None,
                persistence: PersistenceMode::UpsertByKey,
                fanout: FanoutKind::None,
                scope: TaskScope::Account,
                archive_targets: Vec::new(),
                page_size: DEFAULT_PAGE_SIZE,
            },
        }
    }

    pub fn is_global(&self) -> bool {
        self.scope == TaskScope::Global
    }
}

/// Builder for [`TaskDescriptor`].
pub struct TaskDescriptorBuilder {
    descriptor: TaskDescriptor,
}

impl TaskDescriptorBuilder {
    #[must_use]
    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.descriptor.granularity = granularity;
        self
    }

    #[must_use]
    pub fn lookback(mut self, units: u32) -> Self {
        self.descriptor.default_lookback = units;
        self
    }

    #[must_use]
    pub fn max_span_days(mut self, days: u32) -> Self {
        self.descriptor.max_span_days = Some(days);
        self
    }

    #[must_use]
    pub fn persistence(mut self, mode: PersistenceMode) -> Self {
        self.descriptor.persistence = mode;
        self
    }

    #[must_use]
    pub fn fanout(mut self, fanout: FanoutKind) -> Self {
        self.descriptor.fanout = fanout;
        self
    }

    #[must_use]
    pub fn global(mut self) -> Self {
        self.descriptor.scope = TaskScope::Global;
        self
    }

    #[must_use]
    pub fn archive_targets(mut self, targets: impl IntoIterator<Item = TaskType>) -> Self {
        self.descriptor.archive_targets = targets.into_iter().collect();
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.descriptor.page_size = page_size;
        self
    }

    /// Finish the descriptor. Full-resync tasks archive their own
    /// collection unless told otherwise.
    pub fn build(mut self) -> TaskDescriptor {
        if self.descriptor.persistence == PersistenceMode::ArchiveThenFullResync
            && self.descriptor.archive_targets.is_empty()
        {
            self.descriptor.archive_targets = vec![self.descriptor.task_type];
        }
        self.descriptor
    }
}

/// Errors raised while building or querying the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Task already registered: {0}")]
    Duplicate(TaskType),

    #[error("Invalid task {task_type}: {reason}")]
    Invalid { task_type: TaskType, reason: String },

    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

/// Registration table of all tasks, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskType, TaskDescriptor>,
}

fn validate(descriptor: &TaskDescriptor) -> Result<(), RegistryError> {
    let invalid = |reason: &str| RegistryError::Invalid {
        task_type: descriptor.task_type,
        reason: reason.to_string(),
    };

    if descriptor.page_size == 0 {
        return Err(invalid("page size must be at least 1"));
    }
    if descriptor.max_span_days == Some(0) {
        return Err(invalid("max span must be at least 1 day"));
    }
    if descriptor.persistence == PersistenceMode::OverwriteByPeriod
        && !descriptor.granularity.is_windowed()
    {
        return Err(invalid("overwrite-by-period needs a day or month granularity"));
    }
    if descriptor.is_global() && descriptor.fanout != FanoutKind::None {
        return Err(invalid("global tasks cannot fan out"));
    }
    Ok(())
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task, validating its descriptor.
    pub fn register(&mut self, descriptor: TaskDescriptor) -> Result<(), RegistryError> {
        validate(&descriptor)?;
        if self.tasks.contains_key(&descriptor.task_type) {
            return Err(RegistryError::Duplicate(descriptor.task_type));
        }
        self.tasks.insert(descriptor.task_type, descriptor);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, descriptor: TaskDescriptor) -> Result<Self, RegistryError> {
        self.register(descriptor)?;
        Ok(self)
    }

    pub fn get(&self, task_type: TaskType) -> Option<&TaskDescriptor> {
        self.tasks.get(&task_type)
    }

    /// Look up a task, failing for unregistered ones.
    pub fn require(&self, task_type: TaskType) -> Result<&TaskDescriptor, RegistryError> {
        self.get(task_type)
            .ok_or_else(|| RegistryError::UnknownTask(task_type.to_string()))
    }

    /// Resolve a task id string.
    pub fn resolve(&self, name: &str) -> Result<&TaskDescriptor, RegistryError> {
        let task_type: TaskType = name
            .parse()
            .map_err(|_| RegistryError::UnknownTask(name.to_string()))?;
        self.require(task_type)
    }

    pub fn task_types(&self) -> Vec<TaskType> {
        self.tasks.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
