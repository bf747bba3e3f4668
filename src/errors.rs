use miette::Diagnostic;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Startup failures that happen before the service has a database.
#[derive(Debug, Error, Diagnostic)]
pub enum GateError {
    #[error("Database error: {0}")]
    #[diagnostic(code(accessgate::db))]
    Db(#[from] DbErr),
}

/// Errors produced at the persistence boundary.
///
/// A unique-index violation is kept apart from every other database failure
/// so the write paths that can cause one are able to report a conflict
/// without knowing which storage engine is underneath.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    #[diagnostic(code(accessgate::store::unique_violation))]
    UniqueViolation(String),

    #[error("No {table} row with id `{id}`")]
    #[diagnostic(code(accessgate::store::not_found))]
    NotFound { table: &'static str, id: String },

    #[error("Corrupt stored value: {0}")]
    #[diagnostic(code(accessgate::store::corrupt))]
    Corrupt(String),

    #[error("Database error: {0}")]
    #[diagnostic(code(accessgate::store::db))]
    Db(DbErr),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::UniqueViolation(detail),
            _ => StoreError::Db(err),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}
