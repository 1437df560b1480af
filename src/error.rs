//! Error kinds
//!
//! Every failure in an ingestion run maps to one stable [`ErrorKind`] code,
//! which the binary prints alongside the message.

use std::io;
use std::path::Path;

use yacls_gcloud::GcloudError;

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Path cannot be opened or stat'd; stream cannot be read
    Io,
    /// Malformed CSV/HTML/JSON/YAML payload
    Parse,
    /// Expected field missing or unknown enumerant
    Schema,
    /// Companion CLI exited non-zero
    ExternalTool,
    /// Requested ingester is not registered
    UnknownKind,
    /// Nothing to process
    NoInput,
    /// Run configuration is invalid
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "io-error",
            ErrorKind::Parse => "parse-error",
            ErrorKind::Schema => "schema-error",
            ErrorKind::ExternalTool => "external-tool-error",
            ErrorKind::UnknownKind => "unknown-kind",
            ErrorKind::NoInput => "no-input",
            ErrorKind::Config => "config-error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ingestion error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("{0}")]
    Schema(String),

    #[error("{0}")]
    ExternalTool(#[source] GcloudError),

    #[error("unknown kind: {0:?}")]
    UnknownKind(String),

    #[error("no input: {0}")]
    NoInput(String),

    #[error("config: {0}")]
    Config(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io { .. } => ErrorKind::Io,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::Schema(_) => ErrorKind::Schema,
            Error::ExternalTool(_) => ErrorKind::ExternalTool,
            Error::UnknownKind(_) => ErrorKind::UnknownKind,
            Error::NoInput(_) => ErrorKind::NoInput,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn io_path(op: &str, path: &Path, source: io::Error) -> Self {
        Error::io(format!("{op} {}", path.display()), source)
    }

    pub(crate) fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        Error::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }
}

impl From<GcloudError> for Error {
    fn from(err: GcloudError) -> Self {
        match err {
            GcloudError::Spawn { command, source } => Error::io(command, source),
            GcloudError::Decode { command, message } => Error::parse(command, message),
            failed @ GcloudError::Failed { .. } => Error::ExternalTool(failed),
        }
    }
}
