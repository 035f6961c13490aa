//! Boundary to the upstream reporting API.
//!
//! The sync engine talks to the API only through [`ReportClient`]: one
//! authenticated `post(account, path, body)` call returning the common
//! response envelope. Transport, authentication and throttling live behind
//! that trait.

mod errors;
mod rate_limit;
mod types;

pub use errors::{PlatformError, Result, short_error_message};
pub use rate_limit::{ApiRateLimiter, RateLimitedClient, rate_limits};
pub use types::{AccountInfo, ApiResponse, ReportClient, ResponseCode, SuccessCodes};
