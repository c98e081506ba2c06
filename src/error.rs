//! Error types for sqlaudit

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while analyzing queries against a schema
#[derive(Error, Debug)]
pub enum SqlAuditError {
    #[error("Invalid input: {message}")]
    InvalidInputError { message: String },

    #[error("Malformed column reference: {reference}")]
    MalformedReferenceError { reference: String },

    #[error("Unknown table in reference schema: {table}")]
    UnknownTableError { table: String },

    #[error("SQL parse error: {message}")]
    SqlParseError { message: String },

    #[error("Failed to read query log: {path}")]
    QueryLogReadError {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read schema description: {path}")]
    SchemaReadError {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid timestamp {value:?}")]
    TimestampParseError {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl SqlAuditError {
    /// Whether this error concerns a single query rather than the batch.
    ///
    /// Batch operations catch these, skip the offending query, and keep
    /// going; ingestion errors are never recoverable this way.
    pub fn is_per_query(&self) -> bool {
        matches!(
            self,
            SqlAuditError::InvalidInputError { .. }
                | SqlAuditError::MalformedReferenceError { .. }
                | SqlAuditError::UnknownTableError { .. }
                | SqlAuditError::SqlParseError { .. }
        )
    }
}

impl From<sqlparser::parser::ParserError> for SqlAuditError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        SqlAuditError::SqlParseError {
            message: err.to_string(),
        }
    }
}
