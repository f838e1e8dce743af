//! Service-level error type
//!
//! Errors raised while loading configuration, opening the document store or
//! building the outbound clients. Request-scoped failures use
//! [`ApiError`](crate::handlers::ApiError) instead, which owns the mapping to
//! HTTP status codes.

use thiserror::Error;

use crate::repository::RepositoryError;

/// Result type alias using the service error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the service
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Document store could not be opened or persisted
    #[error("Store error: {0}")]
    Store(#[from] RepositoryError),

    /// Media storage client could not be constructed
    #[error("Media storage error: {0}")]
    Media(String),

    /// Mail transport could not be constructed
    #[error("Mail transport error: {0}")]
    Mail(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "I/O error: missing");
    }

    #[test]
    fn test_store_error_conversion() {
        let err: Error = RepositoryError::connection_failed("data dir unavailable").into();
        assert!(err.to_string().starts_with("Store error:"));
    }
}
