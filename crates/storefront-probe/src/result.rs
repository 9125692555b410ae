//! Result and error types for the probe.

use thiserror::Error;

use crate::context::SessionError;
use crate::otp::OtpError;

/// Result type for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors raised while driving the storefront
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set STOREPROBE_CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was being waited for, with the last observation
        waited_for: String,
    },

    /// More than one element matched a strict locator
    #[error("Strict mode violation: {selector} resolved to {count} elements")]
    StrictModeViolation {
        /// Selector description
        selector: String,
        /// Number of matches
        count: usize,
    },

    /// Element action failed (click, fill)
    #[error("{action} on {selector} failed: {message}")]
    ActionFailed {
        /// Action name
        action: &'static str,
        /// Selector description
        selector: String,
        /// Error message
        message: String,
    },

    /// JavaScript evaluation error
    #[error("Evaluation failed: {message}")]
    EvaluationError {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    ScreenshotError {
        /// Error message
        message: String,
    },

    /// Assertion failed (from `expect()`)
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// A named step of a multi-step flow failed
    #[error("{step} failed: {source}")]
    StepFailed {
        /// Step name
        step: String,
        /// Underlying error
        #[source]
        source: Box<ProbeError>,
    },

    /// Session state error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// OTP retrieval error
    #[error(transparent)]
    Otp(#[from] OtpError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::PageError {
            message: message.into(),
        }
    }

    /// Whether this error came from a timed-out wait
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_target() {
        let err = ProbeError::Timeout {
            ms: 10_000,
            waited_for: "text=Login Successfully to be visible".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("10000ms"));
        assert!(msg.contains("Login Successfully"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_strict_violation_message() {
        let err = ProbeError::StrictModeViolation {
            selector: "css=.cart.item".to_string(),
            count: 3,
        };
        assert!(err.to_string().contains("3 elements"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ProbeError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }

    #[test]
    fn test_constructors() {
        assert!(ProbeError::assertion("x").to_string().contains("Assertion"));
        assert!(ProbeError::config("bad").to_string().contains("Configuration"));
        assert!(ProbeError::page("gone").to_string().contains("Page error"));
    }
}
