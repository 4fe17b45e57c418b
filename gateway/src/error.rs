//! Error types for the gateway

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Rejected user input (blank prompt). Nothing was spawned.
    #[error("{0}")]
    Validation(String),

    /// No backend command could be built from the current configuration.
    #[error("{0}")]
    Resolution(String),

    #[error("The backend took too long to respond (timed out after {}s).", .0.as_secs())]
    Timeout(Duration),

    #[error("Backend command failed (exit {}): {message}", exit_label(.exit_code))]
    BackendFailure {
        exit_code: Option<i32>,
        message: String,
    },

    #[error("Config error: {0}")]
    Config(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_failure_message() {
        let err = GatewayError::BackendFailure {
            exit_code: Some(2),
            message: "model not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Backend command failed (exit 2): model not found"
        );
    }

    #[test]
    fn test_killed_backend_has_no_exit_code() {
        let err = GatewayError::BackendFailure {
            exit_code: None,
            message: "terminated".to_string(),
        };
        assert!(err.to_string().contains("exit signal"));
    }

    #[test]
    fn test_timeout_message_mentions_seconds() {
        let err = GatewayError::Timeout(Duration::from_secs(300));
        assert!(err.to_string().contains("300s"));
    }
}
