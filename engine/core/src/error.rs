//! Core error types for the document ingestion and retrieval engine.

/// Errors produced by the engine's core components.
///
/// Variants map directly onto the HTTP-shaped error kinds the orchestration
/// contract promises: the binary crate is responsible for turning these into
/// status codes, not this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No registered format provider claims the file's extension/MIME type.
    #[error("unsupported format: {0}")]
    Unsupported(String),

    /// A provider reported a structured failure while parsing or converting.
    #[error("processing error ({status}): {message}")]
    Processing {
        /// HTTP-shaped status the caller should surface.
        status: u16,
        message: String,
    },

    /// A conversion subprocess (office suite, HTML renderer) exited non-zero.
    #[error("conversion failed: exit={exit_status:?}\nstdout: {stdout}\nstderr: {stderr}")]
    Conversion {
        exit_status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Lookup or deletion of an unknown id in a store.
    #[error("not found: {0}")]
    NotFound(String),

    /// A filesystem operation would have resolved outside its permitted root.
    #[error("path escape: {0}")]
    PathEscape(String),

    /// The blob or vector store backend failed in a way not covered above.
    #[error("store failure: {0}")]
    Store(String),

    /// Any other unexpected I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// A stable, provider-defined processing failure.
    pub fn processing(status: u16, message: impl Into<String>) -> Self {
        Error::Processing {
            status,
            message: message.into(),
        }
    }

    /// HTTP-equivalent status code this error should surface as (see spec §7).
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Unsupported(_) => 415,
            Error::Processing { status, .. } => *status,
            Error::Conversion { .. } => 400,
            Error::NotFound(_) => 404,
            Error::PathEscape(_) => 500,
            Error::Store(_) => 500,
            Error::Io(_) => 500,
        }
    }
}
