//! Error types for the CLI

use storefront_probe::{BootstrapError, OtpError, ProbeError, SessionError};
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// One or more journeys failed
    #[error("Test execution failed: {message}")]
    TestExecution {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Automation library error
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Login bootstrap failed
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    /// Session file error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// OTP provider error
    #[error(transparent)]
    Otp(#[from] OtpError),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a test execution error
    #[must_use]
    pub fn test_execution(message: impl Into<String>) -> Self {
        Self::TestExecution {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_test_execution_error() {
        let err = CliError::test_execution("2 of 6 journeys failed");
        assert!(err.to_string().contains("Test execution"));
    }

    #[test]
    fn test_session_error_keeps_hint() {
        let err: CliError = SessionError::Missing {
            path: PathBuf::from(".auth/storage-state.json"),
        }
        .into();
        assert!(err.to_string().contains("storeprobe setup"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }
}
