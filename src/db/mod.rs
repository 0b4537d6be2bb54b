use async_trait::async_trait;

use crate::{
    errors::LoaderError,
    models::{
        connections::{ConnectionConfig, DbType},
        schema::{ColumnSchema, ForeignKeyColumn, TableId, UniqueConstraint},
    },
};

pub mod mysql;
pub mod postgres;
pub mod sqlite;

/// Read-only view of a database catalog. Every identifier an implementation
/// returns is already normalized: no quoting characters, constraint names
/// lower-cased.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Base tables, in catalog order. An empty `schema` means no restriction.
    async fn list_tables(&self, schema: &str) -> Result<Vec<TableId>, LoaderError>;

    /// Columns in declaration order and the primary-key columns in key order.
    /// A table with no columns is reported as gone.
    async fn columns_and_primary_key(
        &self,
        table: &TableId,
    ) -> Result<(Vec<ColumnSchema>, Vec<String>), LoaderError>;

    /// One row per child column of every foreign key declared on `table`,
    /// ordered by constraint and then key position.
    async fn foreign_key_columns(
        &self,
        table: &TableId,
    ) -> Result<Vec<ForeignKeyColumn>, LoaderError>;

    async fn unique_constraints(
        &self,
        _table: &TableId,
    ) -> Result<Vec<UniqueConstraint>, LoaderError> {
        Ok(Vec::new())
    }

    /// Capability tags this vendor contributes to every entity.
    fn vendor_capabilities(&self) -> Vec<String> {
        Vec::new()
    }

    async fn close(&self) {}
}

pub async fn connect(
    config: &ConnectionConfig,
) -> Result<Box<dyn CatalogReader>, LoaderError> {
    let catalog: Box<dyn CatalogReader> = match config.db_type {
        DbType::Postgres => Box::new(postgres::PostgresCatalog::connect(&config.database_url).await?),
        DbType::MySql => Box::new(mysql::MySqlCatalog::connect(&config.database_url).await?),
        DbType::Sqlite => Box::new(sqlite::SqliteCatalog::connect(&config.database_url).await?),
    };
    Ok(catalog)
}

/// Strips the quoting characters drivers leave around identifiers
/// (`"name"`, `` `name` ``, `[name]`), including around each part of a
/// dotted name.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim()
        .split('.')
        .map(|part| part.trim_matches(|c| matches!(c, '"' | '`' | '[' | ']')))
        .collect::<Vec<_>>()
        .join(".")
}

/// Constraint names compare case-insensitively, so they are stored lower-cased.
pub fn normalize_constraint_name(raw: &str) -> String {
    normalize_identifier(raw).to_lowercase()
}

/// Folds `(constraint, column)` rows, ordered by constraint, into one
/// `UniqueConstraint` per name.
pub fn group_unique_constraints(rows: Vec<(String, String)>) -> Vec<UniqueConstraint> {
    let mut constraints: Vec<UniqueConstraint> = Vec::new();
    for (name, column) in rows {
        match constraints.last_mut() {
            Some(current) if current.name == name => current.columns.push(column),
            _ => constraints.push(UniqueConstraint {
                name,
                columns: vec![column],
            }),
        }
    }
    constraints
}
