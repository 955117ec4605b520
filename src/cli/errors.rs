//! CLI error types
//!
//! Every CLI error ends the process with a non-zero status. Engine and
//! store errors keep their own codes.

use std::io;

use thiserror::Error;

use crate::errors::TreeError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Io(String),

    #[error("data directory already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("data directory not initialized: {0}. Run 'nestedset init' first.")]
    NotInitialized(String),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl CliError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "NEST_CLI_CONFIG_ERROR",
            Self::Io(_) => "NEST_CLI_IO_ERROR",
            Self::AlreadyInitialized(_) => "NEST_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized(_) => "NEST_CLI_NOT_INITIALIZED",
            Self::Tree(e) => e.code(),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::Tree(e.into())
    }
}

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

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeId, TreeId};

    #[test]
    fn test_engine_codes_pass_through() {
        let err: CliError = TreeError::not_found(&TreeId::from("t"), &NodeId::from("x")).into();
        assert_eq!(err.code(), "NEST_NOT_FOUND");

        let err: CliError = StoreError::corruption_at_offset(0, "torn").into();
        assert_eq!(err.code(), "NEST_STORE_CORRUPTION");
    }

    #[test]
    fn test_cli_codes() {
        assert_eq!(CliError::config_error("x").code(), "NEST_CLI_CONFIG_ERROR");
        assert_eq!(
            CliError::NotInitialized("/tmp/x".into()).code(),
            "NEST_CLI_NOT_INITIALIZED"
        );
    }
}
