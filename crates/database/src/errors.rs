//! Error types for the database layer

use thiserror::Error;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("database migration error: {0}")]
    Migration(String),

    #[error("database query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0}")]
    Validation(String),

    #[error("insufficient stock for {sku}: {available} available, {requested} requested")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    #[error("cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("backup failed: {0}")]
    Backup(String),
}

impl DatabaseError {
    /// Map a unique-constraint violation to [`DatabaseError::Duplicate`].
    pub(crate) fn from_insert(error: sqlx::Error, entity: &str) -> Self {
        let unique = error
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            DatabaseError::Duplicate(entity.to_string())
        } else {
            DatabaseError::Query(error)
        }
    }
}
