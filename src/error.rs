//! Error types for dsutil
//!
//! This module defines all error types used throughout the application,
//! providing detailed error information for debugging and user feedback.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for dsutil operations
#[derive(Error, Debug)]
pub enum DsutilError {
    /// I/O error during file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error on a stream with no single associated path
    #[error("I/O error: {0}")]
    IoStream(#[from] std::io::Error),

    /// File or directory not found
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A child command failed
    #[error("Command `{command}` exited with {code:?}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
    },

    /// Failure spawning or talking to a child process
    #[error("Failed to run `{command}`: {source}")]
    CommandIo {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Output of a command could not be parsed
    #[error("Failed to parse output of `{command}`: {message}")]
    OutputParse { command: String, message: String },

    /// No password is available for authentication
    #[error("No password supplied and none saved in the kinit profile")]
    NoPassword,

    /// No usable local python executable
    #[error("No valid local python executable found among: {0}")]
    NoLocalPython(String),

    /// Email notification error
    #[error("Email notification error: {0}")]
    EmailError(String),

    /// Shell table parsing error
    #[error("Table parse error: {0}")]
    TableError(String),

    /// Text processing error
    #[error("Text processing error at '{path}': {message}")]
    TextError { path: PathBuf, message: String },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<DsutilError>,
    },
}

impl DsutilError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a command failure from an exit status
    pub fn command_failed(command: impl Into<String>, status: std::process::ExitStatus) -> Self {
        Self::CommandFailed {
            command: command.into(),
            code: status.code(),
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this error is a permission issue
    pub fn is_permission_error(&self) -> bool {
        match self {
            Self::PermissionDenied(_) => true,
            Self::Io { source, .. } | Self::IoStream(source) => {
                source.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. }
            | Self::NotFound(path)
            | Self::PermissionDenied(path)
            | Self::TextError { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for dsutil operations
pub type Result<T> = std::result::Result<T, DsutilError>;

impl From<serde_yaml::Error> for DsutilError {
    fn from(err: serde_yaml::Error) -> Self {
        DsutilError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for DsutilError {
    fn from(err: serde_json::Error) -> Self {
        DsutilError::ConfigError(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| DsutilError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_result_ext() {
        let err: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "nope",
        ));
        let err = err.with_path("/tmp/x").unwrap_err();
        assert!(err.is_permission_error());
        assert_eq!(err.path().unwrap(), &PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_stream_error_has_no_path_placeholder() {
        let err = DsutilError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe closed",
        ));
        assert_eq!(err.to_string(), "I/O error: pipe closed");
        assert!(err.path().is_none());
    }

    #[test]
    fn test_with_context() {
        let err = DsutilError::NoPassword.with_context("kinit");
        assert!(err.to_string().starts_with("kinit: "));
    }
}
