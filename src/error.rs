//! Custom error types for dvr-console.
//!
//! Every failure a user action can hit is one of these variants. Partial
//! failures inside a bulk action are not errors; they travel as per-item
//! results instead.

use std::error::Error;
use std::fmt;
use std::io;

/// Application error types.
#[derive(Debug)]
pub enum AppError {
    /// Network/HTTP failure or an unreadable response body
    Transport(String),
    /// Local precondition failed before any request was made
    Validation(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(io::Error),
}

impl AppError {
    /// Shorthand for a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Whether this error was raised locally, without touching the network.
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Transport(msg) => write!(f, "Error: {}", msg),
            AppError::Validation(msg) => write!(f, "{}", msg),
            AppError::Config(msg) => write!(f, "Config error: {}", msg),
            AppError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Transport(format!("unreadable response: {}", err))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_keeps_raw_description() {
        let err = AppError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Error: connection refused");
    }

    #[test]
    fn test_validation_display_is_bare_message() {
        let err = AppError::validation("No episodes selected");
        assert_eq!(err.to_string(), "No episodes selected");
        assert!(err.is_validation());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.source().is_some());
    }

    #[test]
    fn test_error_from_json_is_transport() {
        let json_err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let app_err: AppError = json_err.into();
        assert!(matches!(app_err, AppError::Transport(_)));
        assert!(!app_err.is_validation());
    }
}
