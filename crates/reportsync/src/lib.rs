//! reportsync - mirrors a paginated, rate-limited reporting API into a local
//! store.
//!
//! The library decides which time window each `(account, task[, dimension])`
//! needs next, pages and chunks the upstream requests within their limits,
//! and persists results so repeated runs converge on the upstream data
//! without duplicates.
//!
//! # Features
//!
//! - `sqlite` / `postgres` - Database backends.
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to bring the schema up to date on connection.
//! - `http` - The reqwest-backed [`http::HttpReportClient`] transport.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reportsync::{connect_and_migrate, sync::{Orchestrator, SyncContext, default_registry}};
//!
//! let db = connect_and_migrate("sqlite://reports.db?mode=rwc").await?;
//! let ctx = SyncContext::builder()
//!     .client(Arc::new(client))
//!     .database(Arc::new(db))
//!     .build()?;
//! let summary = Orchestrator::new(default_registry()?, ctx).run_all().await;
//! ```

pub mod db;
pub mod entity;
pub mod http;
pub mod platform;
pub mod repository;
pub mod retry;
pub mod sync;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use platform::{
    AccountInfo, ApiRateLimiter, ApiResponse, PlatformError, RateLimitedClient, ReportClient,
    SuccessCodes, rate_limits,
};
pub use repository::{RepositoryError, SyncKey};
pub use sync::{Orchestrator, SyncContext, SyncError, SyncOptions, SyncSummary};
