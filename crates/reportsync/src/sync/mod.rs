//! The synchronization engine.
//!
//! Mirrors report/entity types of the upstream API into the local store,
//! one `(account, task[, dimension])` run at a time.
//!
//! # Module Structure
//!
//! - [`task`] - `TaskDescriptor`, `TaskHandler` and the `TaskRegistry`
//! - [`catalog`] - Built-in tasks and `default_registry()`
//! - [`window`] / [`chunk`] - What to fetch next and how to split it
//! - [`fanout`] - Sub-dimensions an account must be iterated over
//! - [`pagination`] - Offset/length loop with partial-failure tolerance
//! - [`persist`] - Upsert, overwrite-by-period and full-resync writes
//! - [`runner`] / [`orchestrator`] - Run state machine and task × account loop
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//!
//! # Example
//!
//! ```ignore
//! use reportsync::sync::{Orchestrator, SyncContext, SyncOptions, default_registry};
//!
//! let ctx = SyncContext::builder()
//!     .client(Arc::new(client))
//!     .database(Arc::new(db))
//!     .options(SyncOptions::default())
//!     .build()?;
//! let orchestrator = Orchestrator::new(default_registry()?, ctx);
//! let summary = orchestrator.run_all().await;
//! println!("{} records, {} failed runs", summary.total_records, summary.fail_count);
//! ```

pub mod catalog;
pub mod chunk;
mod context;
pub mod directory;
mod error;
pub mod fanout;
pub mod orchestrator;
pub mod pacing;
pub mod pagination;
pub mod period;
pub mod persist;
mod progress;
pub mod runner;
pub mod task;
mod types;
pub mod window;

// Re-export types
pub use types::{
    PaginationConfig, RunOutcome, SyncMode, SyncOptions, SyncSummary, TaskSummary, WindowConfig,
};

// Re-export constants
pub use types::{DEFAULT_MAX_PAGES, DEFAULT_PACING_MS, GLOBAL_ACCOUNT_ID};

// Re-export progress types
pub use progress::{ProgressCallback, SyncProgress, emit};

pub use catalog::{EndpointHandler, builtin_tasks, default_registry};
pub use context::{SyncContext, SyncContextBuilder};
pub use directory::DbDirectory;
pub use error::{Result, SyncError};
pub use fanout::{Dimension, DimensionEntry, Directory, FanoutKind};
pub use orchestrator::Orchestrator;
pub use pacing::{NoDelay, PacingConfig, PacingStrategy};
pub use period::{DateRange, Granularity, Period};
pub use persist::PersistencePolicy;
pub use runner::SyncRunner;
pub use task::{
    PageRequest, PersistenceMode, RegistryError, TaskDescriptor, TaskHandler, TaskRegistry,
    TaskScope,
};
