//! Store error type and mappings from Diesel and pool failures.
//!
//! The driver needs three distinctions the raw Diesel error does not give
//! it directly: "row not present" (typed, consumed during find-or-insert),
//! "lost a serializable conflict" (retriable by the client), and
//! everything else.

use thiserror::Error;
use tracing::debug;

use crate::domain::{Error as DomainError, ErrorCode};

use super::pool::PoolError;

/// Errors surfaced by the persistence adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested row does not exist.
    #[error("record not found")]
    NotFound,
    /// The transaction lost a serializable conflict or an insert race;
    /// retrying the request converges.
    #[error("transaction conflict: {message}")]
    Conflict { message: String },
    /// Database connectivity failure.
    #[error("database connection failed: {message}")]
    Connection { message: String },
    /// Query execution or row decoding failure.
    #[error("database query failed: {message}")]
    Query { message: String },
}

impl StoreError {
    /// Helper for conflict failures.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Helper for connection failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        match &error {
            DieselError::DatabaseError(kind, info) => {
                debug!(?kind, message = info.message(), "diesel operation failed");
            }
            other => debug!(error = %other, "diesel operation failed"),
        }

        match error {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, info) => {
                Self::conflict(info.message().to_owned())
            }
            // Two first receipts racing on the unique `(user_id, key)`
            // index; the loser retries and becomes a replay.
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::conflict(info.message().to_owned())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
                Self::connection("database connection closed")
            }
            _ => Self::query("database error"),
        }
    }
}

impl From<PoolError> for StoreError {
    fn from(error: PoolError) -> Self {
        Self::connection(error.to_string())
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        let code = match err {
            StoreError::NotFound => return DomainError::not_found("record not found"),
            StoreError::Conflict { .. } => ErrorCode::ConflictRetry,
            StoreError::Connection { .. } | StoreError::Query { .. } => ErrorCode::Internal,
        };
        DomainError::new(code, "database operation failed").with_cause(err)
    }
}

impl From<diesel::result::Error> for DomainError {
    fn from(error: diesel::result::Error) -> Self {
        DomainError::from(StoreError::from(error))
    }
}

impl From<PoolError> for DomainError {
    fn from(error: PoolError) -> Self {
        DomainError::from(StoreError::from(error))
    }
}
