use thiserror::Error;

/// Errors that abort a load run.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Catalog query failed for a specific table, or the table vanished
    /// between listing and introspection.
    #[error("Catalog access error on {table}: {reason}")]
    CatalogAccess { table: String, reason: String },
    /// Driver-level failure outside of a per-table query (e.g. listing tables).
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Connection error: {0}")]
    Connection(String),
    /// Two accepted tables produced the same moniker.
    #[error("Duplicate moniker {moniker}: table {table} collides with {existing}")]
    DuplicateMoniker {
        moniker: String,
        table: String,
        existing: String,
    },
    /// One relationship pair could not be declared. Recovered by the
    /// inference engine; never aborts a run on its own.
    #[error("Relationship inference failed for constraint {constraint} on {table}: {reason}")]
    RelationshipInference {
        constraint: String,
        table: String,
        reason: String,
    },
    #[error("Invalid table pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LoaderError {
    pub fn catalog_access(table: impl ToString, reason: impl ToString) -> Self {
        LoaderError::CatalogAccess {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error came from the catalog or its connection.
    pub fn is_catalog_access(&self) -> bool {
        matches!(
            self,
            LoaderError::CatalogAccess { .. } | LoaderError::Sqlx(_) | LoaderError::Connection(_)
        )
    }
}

/// Non-fatal conditions recorded during a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadWarning {
    #[error("table {table} has no primary key")]
    MissingPrimaryKey { table: String },
    #[error("relationship for constraint {constraint} on {table} skipped: {reason}")]
    RelationshipFailed {
        constraint: String,
        table: String,
        reason: String,
    },
}
