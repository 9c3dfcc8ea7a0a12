//! Centralized error handling for tidyframe.
//!
//! Every core operation returns a tagged [`Result`]: either the value or one
//! of the [`TidyError`] kinds below. Nothing in the core panics or throws to
//! signal a bad request.
//!
//! ## Error Kinds
//!
//! The first group describes a bad request from the caller and is what a
//! front-end surfaces with a client-error status:
//!
//! ```
//! use tidyframe::error::TidyError;
//!
//! fn status_for(err: &TidyError) -> u16 {
//!     if err.is_client_error() { 400 } else { 500 }
//! }
//!
//! assert_eq!(status_for(&TidyError::InvalidColumn("price".to_owned())), 400);
//! ```
//!
//! ## Context Extension Trait
//!
//! The `ResultExt` trait adds `.context()` to any `Result` whose error converts
//! into `TidyError`:
//!
//! ```no_run
//! use tidyframe::error::ResultExt;
//! use std::fs;
//!
//! fn read_upload() -> tidyframe::error::Result<Vec<u8>> {
//!     fs::read("uploads/data.csv").context("Failed to read upload")
//! }
//! ```

use std::fmt;

/// Main error type for tidyframe operations.
#[derive(Debug)]
pub enum TidyError {
    /// File extension outside the configured set (csv, xls, xlsx)
    UnsupportedFormat(String),

    /// Encoding or content failure while loading a file
    Parse(String),

    /// An operation referenced a column the table does not have
    InvalidColumn(String),

    /// Unknown action, numeric operation on a text column, or a missing parameter
    InvalidOperation(String),

    /// Nothing has been stored under the requested name
    NotFound(String),

    /// Dataset name that would escape the storage root
    InvalidPath(String),

    /// I/O errors (file operations)
    Io(std::io::Error),

    /// Dataframe engine failure while transforming or writing a table
    DataProcessing(String),

    /// Configuration errors
    Config(String),

    /// Generic error with context
    Other(String),
}

impl TidyError {
    /// Whether the failure was caused by the request rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_)
                | Self::Parse(_)
                | Self::InvalidColumn(_)
                | Self::InvalidOperation(_)
                | Self::NotFound(_)
                | Self::InvalidPath(_)
        )
    }
}

impl fmt::Display for TidyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat(ext) => write!(f, "Unsupported file format: {ext}"),
            Self::Parse(msg) => write!(f, "Error reading file: {msg}"),
            Self::InvalidColumn(name) => write!(f, "Column not found: {name}"),
            Self::InvalidOperation(msg) => write!(f, "Invalid operation: {msg}"),
            Self::NotFound(name) => write!(f, "Dataset not found: {name}"),
            Self::InvalidPath(msg) => write!(f, "Invalid path: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TidyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TidyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for TidyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for TidyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for TidyError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<TidyError> for String {
    fn from(err: TidyError) -> Self {
        err.to_string()
    }
}

/// Result type alias for tidyframe operations.
pub type Result<T> = std::result::Result<T, TidyError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<TidyError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: TidyError = e.into();
            TidyError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: TidyError = e.into();
            TidyError::Other(format!("{}: {}", f(), err))
        })
    }
}
