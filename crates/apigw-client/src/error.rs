//! Errors of the `apigw` command-line tool.

use std::fmt;

use apigw_protocol::ClientError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur while running a command.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// Invalid command-line input.
    Input(String),
    /// IO error.
    Io(std::io::Error),
    /// The gateway call failed.
    Gateway(ClientError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Input(msg) => write!(f, "invalid input: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Gateway(err) => write!(f, "gateway error: {}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Gateway(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        Self::Gateway(err)
    }
}
