//! Controllers: the outward surface over the repositories.
//!
//! Each controller borrows the [`Database`](crate::db::Database), runs
//! repository operations and translates [`DatabaseError`] into
//! [`ClinicError`], which carries a stable code for callers.

pub mod appointments;
pub mod patients;
pub mod roles;
pub mod staff;

pub use appointments::AppointmentController;
pub use patients::PatientController;
pub use roles::RoleController;
pub use staff::{EmployeeController, RoomController};

use serde::Serialize;

use crate::db::DatabaseError;
use crate::query::QueryError;

/// Structured error body for callers that serialize failures.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// Controller-level errors, grouped by who has to act on them.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    /// The caller sent something unacceptable: bad field, unknown column,
    /// dangling reference, duplicate.
    #[error("Invalid request: {0}")]
    Validation(#[source] DatabaseError),
    #[error("Not found: {0}")]
    NotFound(#[source] DatabaseError),
    /// The database itself failed.
    #[error("Storage failure: {0}")]
    Storage(#[source] DatabaseError),
}

impl ClinicError {
    pub fn inner(&self) -> &DatabaseError {
        match self {
            Self::Validation(e) | Self::NotFound(e) | Self::Storage(e) => e,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self.inner() {
            DatabaseError::NotFound { .. } => "NOT_FOUND",
            DatabaseError::Validation { .. } => "INVALID_FIELD",
            DatabaseError::InvalidEnum { .. } => "INVALID_FIELD",
            DatabaseError::ReferencedEntityNotFound { .. } => "REFERENCE_MISSING",
            DatabaseError::DuplicateCombination { .. } => "DUPLICATE",
            DatabaseError::ConstraintViolation { .. } => "CONSTRAINT",
            DatabaseError::Query(QueryError::UnknownColumn { .. }) => "UNKNOWN_COLUMN",
            DatabaseError::Query(QueryError::UnsupportedOperator { .. }) => "UNSUPPORTED_OPERATOR",
            DatabaseError::Query(_) => "INVALID_QUERY",
            DatabaseError::ConnectionClosed => "DATABASE_CLOSED",
            DatabaseError::Connection(_)
            | DatabaseError::CreateDir { .. }
            | DatabaseError::Storage { .. }
            | DatabaseError::SchemaInit { .. } => "STORAGE",
        }
    }

    /// Serializable form. Storage details stay in the log.
    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            Self::Storage(_) => "An internal error occurred".to_string(),
            Self::Validation(e) | Self::NotFound(e) => e.to_string(),
        };
        ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message,
            },
        }
    }
}

impl From<DatabaseError> for ClinicError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { .. } => Self::NotFound(err),
            DatabaseError::Query(_)
            | DatabaseError::Validation { .. }
            | DatabaseError::ReferencedEntityNotFound { .. }
            | DatabaseError::DuplicateCombination { .. }
            | DatabaseError::ConstraintViolation { .. }
            | DatabaseError::InvalidEnum { .. } => Self::Validation(err),
            DatabaseError::Connection(_)
            | DatabaseError::ConnectionClosed
            | DatabaseError::CreateDir { .. }
            | DatabaseError::Storage { .. }
            | DatabaseError::SchemaInit { .. } => {
                tracing::error!(error = %err, "Storage failure");
                Self::Storage(err)
            }
        }
    }
}

impl From<QueryError> for ClinicError {
    fn from(err: QueryError) -> Self {
        DatabaseError::from(err).into()
    }
}
