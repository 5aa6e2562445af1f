//! CLI-level errors (wraps infrastructure errors)

use std::io::ErrorKind;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        Self::Infra(e.into())
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { source, .. } if source.kind() == ErrorKind::NotFound => {
                    exitcode::NOINPUT
                }
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Document { .. } => exitcode::DATAERR,
                InfraError::Application(ApplicationError::Config { .. }) => exitcode::CONFIG,
                InfraError::Application(_) => exitcode::SOFTWARE,
            },
        }
    }
}
