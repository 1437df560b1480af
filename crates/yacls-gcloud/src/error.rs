//! Adapter errors

use std::io;

/// Failure talking to the companion tool
#[derive(Debug, thiserror::Error)]
pub enum GcloudError {
    /// The tool could not be started at all
    #[error("{command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The tool ran and exited non-zero
    #[error("{command}: {status}\nstderr: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The tool's output was not the expected document shape
    #[error("{command}: decode: {message}")]
    Decode { command: String, message: String },
}

impl GcloudError {
    /// Rendered command line that produced this error
    pub fn command(&self) -> &str {
        match self {
            GcloudError::Spawn { command, .. }
            | GcloudError::Failed { command, .. }
            | GcloudError::Decode { command, .. } => command,
        }
    }
}
