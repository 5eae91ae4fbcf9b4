//! Error types for the environment abstraction.

use thiserror::Error;

/// Errors raised by external environment actions.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A shell action ran but exited unsuccessfully
    #[error("Command `{command}` failed (exit code {status:?}): {stderr}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// A shell action could not be started at all
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An environment or runtime name is not safe to hand to the shell
    #[error("Invalid environment name: {0:?}")]
    InvalidName(String),
}

impl EnvError {
    /// Creates a command failure from a finished process.
    pub fn command_failed(command: impl Into<String>, status: Option<i32>, stderr: &[u8]) -> Self {
        Self::CommandFailed {
            command: command.into(),
            status,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}
