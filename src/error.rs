use thiserror::Error;

use crate::migrate::record::MigrationKey;

/// Errors raised while applying migration records or writing rows.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MigrationError {
    #[error("migration {migration} depends on {dependency}, which is not applied")]
    DependencyNotApplied {
        migration: MigrationKey,
        dependency: MigrationKey,
    },

    #[error("migration {0} is already applied")]
    DuplicateApplication(MigrationKey),

    #[error("no migration named {0}")]
    UnknownMigration(String),

    #[error("constraint violation on {table}.{column}: {reason}")]
    ConstraintViolation {
        table: String,
        column: String,
        reason: String,
    },

    #[error("invalid operation on {table}.{column}: {reason}")]
    InvalidOperation {
        table: String,
        column: String,
        reason: String,
    },

    #[error("table {0} does not exist")]
    UnknownTable(String),

    #[error("table {0} already exists")]
    DuplicateTable(String),

    #[error("column {table}.{column} does not exist")]
    UnknownColumn { table: String, column: String },

    #[error("column {table}.{column} already exists")]
    DuplicateColumn { table: String, column: String },

    #[error("row {index} of table {table} does not exist")]
    UnknownRow { table: String, index: usize },
}

impl MigrationError {
    pub fn constraint(table: &str, column: &str, reason: impl Into<String>) -> Self {
        MigrationError::ConstraintViolation {
            table: table.to_string(),
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid(table: &str, column: &str, reason: impl Into<String>) -> Self {
        MigrationError::InvalidOperation {
            table: table.to_string(),
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unknown_column(table: &str, column: &str) -> Self {
        MigrationError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

pub type MigrationResult<T> = Result<T, MigrationError>;
