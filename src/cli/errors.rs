//! CLI-specific error types
//!
//! These are failures of the tool itself (bad config, unreadable files).
//! A document that fails validation is a normal outcome, not a `CliError`.

use std::fmt;
use std::io;

use crate::schema::LoaderError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (files, stdin/stdout)
    IoError,
    /// Expression file could not be parsed
    ExpressionError,
    /// Named expression not found
    ExpressionNotFound,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "TYPEA_CLI_CONFIG_ERROR",
            Self::IoError => "TYPEA_CLI_IO_ERROR",
            Self::ExpressionError => "TYPEA_CLI_EXPRESSION_ERROR",
            Self::ExpressionNotFound => "TYPEA_CLI_EXPRESSION_NOT_FOUND",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Expression neither a readable file nor a loaded name
    pub fn expression_not_found(expr: &str) -> Self {
        Self::new(
            CliErrorCode::ExpressionNotFound,
            format!(
                "Expression '{}' is not a file and no expression with that name is loaded",
                expr
            ),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<LoaderError> for CliError {
    fn from(e: LoaderError) -> Self {
        match e {
            LoaderError::Io { .. } => Self::io_error(e.to_string()),
            _ => Self::new(CliErrorCode::ExpressionError, e.to_string()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
