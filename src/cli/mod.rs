//! CLI support for dynexpr
//!
//! Provides programmatic access to the CLI functionality for embedding in
//! other tools.

mod check;

pub use check::{execute_check, CheckOptions, CheckResult};

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Parser error
    Parse(crate::ParseError),
    /// A `--param` value that is not of the form `name:Type`
    InvalidParameter(String),
    /// A type name that resolves to nothing
    UnknownType(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Parse(e) => write!(f, "Parse error: {}", e),
            CliError::InvalidParameter(raw) => {
                write!(f, "Invalid parameter '{}': expected name:Type", raw)
            }
            CliError::UnknownType(name) => {
                write!(f, "Unknown type: '{}'\nRun 'dynexpr types' to see available types.", name)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<crate::ParseError> for CliError {
    fn from(e: crate::ParseError) -> Self {
        CliError::Parse(e)
    }
}
