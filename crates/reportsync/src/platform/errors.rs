use thiserror::Error;

/// Errors returned by the upstream reporting API client.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The API answered with a code outside the endpoint's success set.
    #[error("API error{}: {message}", code_suffix(.code))]
    Api {
        code: Option<String>,
        message: String,
    },

    /// The API throttled the request.
    #[error("Rate limit exceeded: {message}")]
    RateLimited { message: String },

    /// The account has no usable credentials.
    #[error("Authentication required")]
    AuthRequired,

    /// Network or connection error.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The response body did not have the expected shape.
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Unexpected/internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" (code {c})"))
        .unwrap_or_default()
}

impl PlatformError {
    /// Create an API error.
    #[inline]
    pub fn api(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Create a rate limit error.
    #[inline]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    /// Create a network error.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an internal error.
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is a rate limit error.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which keeps progress output
/// and joined run errors on one line.
///
/// # Example
///
/// ```ignore
/// use reportsync::platform::short_error_message;
/// let error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
/// assert_eq!(short_error_message(&error), "file not found");
/// ```
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
