//! Error types for quackpad.

use thiserror::Error;

/// Main error type for quackpad operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error loading an uploaded file into the database
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Error during SQL query execution
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to file ingestion.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Uploaded bytes are not valid UTF-8 text
    #[error("{file}: content is not valid UTF-8")]
    Utf8 { file: String },

    /// Could not materialize the upload to a temporary file
    #[error("{file}: temporary file error: {reason}")]
    TempFile { file: String, reason: String },

    /// The engine rejected the file during table registration
    #[error("{file}: {reason}")]
    Registration { file: String, reason: String },
}

/// Errors related to SQL statement execution.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Execution failed inside the engine (syntax error, missing table, ...)
    #[error("{0}")]
    Execution(String),
}

impl From<duckdb::Error> for QueryError {
    fn from(err: duckdb::Error) -> Self {
        QueryError::Execution(err.to_string())
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Error::Query(QueryError::from(err))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
