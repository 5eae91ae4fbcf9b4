//! Error types for the experiment driver.

use std::path::PathBuf;
use stride_env::EnvError;
use thiserror::Error;

/// Errors that abort a run or a scenario.
///
/// Malformed agent responses never show up here: the transport absorbs them
/// into sentinel values and the run continues.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Bad matrix / pattern parameters; raised before any scenario runs
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Provisioning, teardown or eviction failed
    #[error("External command failed: {0}")]
    ExternalCommand(#[from] EnvError),

    /// External cancellation signal
    #[error("Interrupted")]
    Interrupted,

    /// The result log could not be written
    #[error("Result log {path:?}: {source}")]
    ResultLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be read or parsed
    #[error("Config file {path:?}: {message}")]
    ConfigFile { path: PathBuf, message: String },
}

impl HarnessError {
    /// Creates an invalid-configuration error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
