//! Typed errors for the persistence layer.
//!
//! Two levels mirror the two layers of the crate:
//!
//! - [`DatabaseError`]: anything a storage backend can fail with. Driver
//!   and I/O failures are wrapped with a human-readable context message and
//!   keep the underlying cause as `source`.
//! - [`ServiceError`]: business-rule violations raised by the services
//!   (duplicate insert, update of a missing record) plus re-wrapped backend
//!   failures.
//!
//! No layer retries internally; transient failures surface immediately and
//! retry policy belongs to the caller.

use thiserror::Error;

/// Boxed cause for wrapped backend failures.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Invalid input detected before any I/O. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The targeted record does not exist (delete/update of a missing id).
    #[error("{0}")]
    NotFound(String),

    /// A record could not be encoded or decoded (file line, BSON document).
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An underlying driver or I/O failure, wrapped with context.
    #[error("{context}: {source}")]
    Operation {
        context: String,
        #[source]
        source: BoxedError,
    },
}

impl DatabaseError {
    /// Wrap a driver/I-O error with a context message.
    pub fn operation<E>(context: impl Into<String>, source: E) -> DatabaseError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DatabaseError::Operation {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn not_found_invoice(id: i64) -> DatabaseError {
        DatabaseError::NotFound(format!("no invoice with id: {id}"))
    }

    pub fn not_found_user(id: i64) -> DatabaseError {
        DatabaseError::NotFound(format!("no user with id: {id}"))
    }
}

impl From<std::io::Error> for DatabaseError {
    fn from(err: std::io::Error) -> Self {
        DatabaseError::operation("io error", err)
    }
}

/// Errors raised by the invoice and user services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid input detected before touching the backend.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Insert attempted over an id (or unique email) that already exists.
    #[error("{0}")]
    AlreadyExists(String),

    /// Update or delete targeted a record that does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A backend failure, re-wrapped for the caller above the service.
    #[error("database operation failed: {0}")]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DatabaseError::operation("saving invoice", io);

        assert!(err.to_string().starts_with("saving invoice"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn service_error_wraps_database_error() {
        let err: ServiceError = DatabaseError::not_found_invoice(9).into();
        match err {
            ServiceError::Database(DatabaseError::NotFound(msg)) => {
                assert!(msg.contains('9'));
            }
            other => panic!("expected Database(NotFound), got: {other:?}"),
        }
    }
}
