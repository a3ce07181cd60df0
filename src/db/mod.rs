pub mod repository;
pub mod sqlite;

pub use repository::*;
pub use sqlite::*;

use thiserror::Error;

use crate::query::QueryError;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Opening, configuring or closing the connection failed.
    #[error("SQLite connection error: {0}")]
    Connection(#[from] rusqlite::Error),

    #[error("Database connection is closed")]
    ConnectionClosed,

    #[error("Cannot create database directory {}: {source}", path.display())]
    CreateDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error during {operation} on {table}: {source}")]
    Storage {
        table: &'static str,
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Referenced {entity} with id {id} does not exist")]
    ReferencedEntityNotFound { entity: &'static str, id: i64 },

    #[error("{entity} already exists with {detail}")]
    DuplicateCombination { entity: &'static str, detail: String },

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Constraint violated on {table}: {detail}")]
    ConstraintViolation { table: &'static str, detail: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Schema initialization failed at version {version}: {reason}")]
    SchemaInit { version: i64, reason: String },
}

impl DatabaseError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Wrap a driver error raised by a statement against `table`.
    ///
    /// Constraint failures mean a pre-check was bypassed or raced; they keep
    /// their own variant so callers can tell them from I/O trouble.
    pub fn storage(table: &'static str, operation: &'static str, source: rusqlite::Error) -> Self {
        if source.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            return Self::ConstraintViolation {
                table,
                detail: source.to_string(),
            };
        }
        Self::Storage {
            table,
            operation,
            source,
        }
    }
}

/// Attach table/operation context to a raw `rusqlite` result.
pub trait StorageContext<T> {
    fn storage(self, table: &'static str, operation: &'static str) -> Result<T, DatabaseError>;
}

impl<T> StorageContext<T> for rusqlite::Result<T> {
    fn storage(self, table: &'static str, operation: &'static str) -> Result<T, DatabaseError> {
        self.map_err(|e| DatabaseError::storage(table, operation, e))
    }
}
