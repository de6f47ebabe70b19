use thiserror::Error;

/// Error type for dbridge operations.
///
/// Native engine failures are caught at the adapter boundary and re-raised as
/// one of these variants carrying the native message; a raw client-library
/// error never crosses into caller code.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection is closed: {0}")]
    Disconnected(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Prepare failed: {0}")]
    Prepare(String),

    #[error("Statement already finished")]
    StatementFinished,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid connection parameter: {0}")]
    Config(String),
}

/// Result type alias for dbridge operations
pub type Result<T> = std::result::Result<T, DriverError>;
