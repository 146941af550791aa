//! Error types for the data-access layer.

use thiserror::Error;

/// Main error type for driver, codec and statement-builder operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No factory is registered under the requested driver name
    #[error("{name} driver is not registered")]
    UnknownDriver { name: String },

    /// Factory or dial failure (malformed DSN, unreachable server, closed pool)
    #[error("Connection error: {}", chain_message(.0))]
    Connection(anyhow::Error),

    /// Malformed SQL or a statement rejected by the backend
    #[error("Query error: {}", chain_message(.0))]
    Query(anyhow::Error),

    /// The row codec met a value it cannot render as a string
    #[error("Unsupported type {type_name} in column `{column}`")]
    UnsupportedType { column: String, type_name: String },

    /// Malformed input row for an insert or update
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A bulk operation received zero rows
    #[error("Bulk {operation} on table `{table}` received an empty batch")]
    EmptyBatch { table: String, operation: String },
}

impl Error {
    /// Wrap a backend error raised while connecting
    pub fn connection(err: impl Into<anyhow::Error>) -> Self {
        Error::Connection(err.into())
    }

    /// Wrap a backend error raised while running a statement
    pub fn query(err: impl Into<anyhow::Error>) -> Self {
        Error::Query(err.into())
    }

    /// Create a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Create an EmptyBatch error
    pub fn empty_batch(table: impl Into<String>, operation: impl Into<String>) -> Self {
        Error::EmptyBatch {
            table: table.into(),
            operation: operation.into(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Join an error chain into one line, skipping causes whose text an outer
/// layer already printed.
fn chain_message(err: &anyhow::Error) -> String {
    let mut message = String::new();
    for cause in err.chain() {
        let text = cause.to_string();
        if message.contains(&text) {
            continue;
        }
        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&text);
    }
    message
}

/// Result type alias for data-access operations.
pub type Result<T> = std::result::Result<T, Error>;
