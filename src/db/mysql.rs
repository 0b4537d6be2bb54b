use async_trait::async_trait;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool, Row};

use crate::{
    errors::LoaderError,
    models::schema::{ColumnSchema, ForeignKeyColumn, TableId, UniqueConstraint},
};

use super::{
    group_unique_constraints, normalize_constraint_name, normalize_identifier, CatalogReader,
};

// information_schema columns are cast to CHAR: MySQL 8 reports several of
// them as binary strings, which do not decode into `String`.
const LIST_TABLES: &str = r#"
    SELECT CAST(TABLE_SCHEMA AS CHAR) AS table_schema,
           CAST(TABLE_NAME AS CHAR) AS table_name
    FROM information_schema.TABLES
    WHERE TABLE_TYPE = 'BASE TABLE'
      AND TABLE_SCHEMA = COALESCE(NULLIF(?, ''), DATABASE())
    ORDER BY TABLE_NAME
"#;

const COLUMNS: &str = r#"
    SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
           CAST(COLUMN_TYPE AS CHAR) AS data_type,
           CAST(IS_NULLABLE AS CHAR) AS is_nullable,
           CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
           CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS size
    FROM information_schema.COLUMNS
    WHERE TABLE_SCHEMA = COALESCE(NULLIF(?, ''), DATABASE()) AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

const KEY_COLUMNS: &str = r#"
    SELECT CAST(kcu.CONSTRAINT_NAME AS CHAR) AS constraint_name,
           CAST(kcu.COLUMN_NAME AS CHAR) AS column_name
    FROM information_schema.TABLE_CONSTRAINTS tc
    JOIN information_schema.KEY_COLUMN_USAGE kcu
      ON kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
     AND kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
     AND kcu.TABLE_NAME = tc.TABLE_NAME
    WHERE tc.CONSTRAINT_TYPE = ?
      AND tc.TABLE_SCHEMA = COALESCE(NULLIF(?, ''), DATABASE())
      AND tc.TABLE_NAME = ?
    ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
"#;

const FOREIGN_KEYS: &str = r#"
    SELECT CAST(CONSTRAINT_NAME AS CHAR) AS constraint_name,
           CAST(COLUMN_NAME AS CHAR) AS column_name,
           CAST(REFERENCED_TABLE_SCHEMA AS CHAR) AS referenced_schema,
           CAST(REFERENCED_TABLE_NAME AS CHAR) AS referenced_table,
           CAST(REFERENCED_COLUMN_NAME AS CHAR) AS referenced_column,
           CAST(DATABASE() AS CHAR) AS current_schema
    FROM information_schema.KEY_COLUMN_USAGE
    WHERE TABLE_SCHEMA = COALESCE(NULLIF(?, ''), DATABASE())
      AND TABLE_NAME = ?
      AND REFERENCED_TABLE_NAME IS NOT NULL
    ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
"#;

pub struct MySqlCatalog {
    pub pool: MySqlPool,
}

impl MySqlCatalog {
    pub async fn connect(database_url: &str) -> Result<Self, LoaderError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| LoaderError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    fn schema_of(table: &TableId) -> &str {
        table.schema.as_deref().unwrap_or_default()
    }

    async fn key_columns(
        &self,
        table: &TableId,
        constraint_type: &str,
    ) -> Result<Vec<(String, String)>, LoaderError> {
        let rows = sqlx::query(KEY_COLUMNS)
            .bind(constraint_type)
            .bind(Self::schema_of(table))
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LoaderError::catalog_access(table, e))?;

        rows.iter()
            .map(|row| -> Result<(String, String), sqlx::Error> {
                let constraint: String = row.try_get("constraint_name")?;
                let column: String = row.try_get("column_name")?;
                Ok((
                    normalize_constraint_name(&constraint),
                    normalize_identifier(&column),
                ))
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| LoaderError::catalog_access(table, e))
    }
}

/// Tables listed from the connection's default database are unqualified, so
/// a parent in that same database is too. A parent in any other database
/// keeps its schema and never matches an unqualified registry key.
fn referenced_table(
    child: &TableId,
    schema: String,
    parent: String,
    current_schema: Option<&str>,
) -> TableId {
    let same_database = current_schema.is_some_and(|current| current == schema);
    if child.schema.is_none() && same_database {
        TableId::new(parent)
    } else {
        TableId::qualified(schema, parent)
    }
}

#[async_trait]
impl CatalogReader for MySqlCatalog {
    async fn list_tables(&self, schema: &str) -> Result<Vec<TableId>, LoaderError> {
        let rows = sqlx::query(LIST_TABLES)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(LoaderError::Sqlx)?;

        // Tables from the connection's default database stay unqualified so
        // monikers and filters see plain names.
        let tables = rows
            .iter()
            .map(|row| -> Result<TableId, sqlx::Error> {
                let name: String = row.try_get("table_name")?;
                let name = normalize_identifier(&name);
                if schema.is_empty() {
                    Ok(TableId::new(name))
                } else {
                    let table_schema: String = row.try_get("table_schema")?;
                    Ok(TableId::qualified(normalize_identifier(&table_schema), name))
                }
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(tables)
    }

    async fn columns_and_primary_key(
        &self,
        table: &TableId,
    ) -> Result<(Vec<ColumnSchema>, Vec<String>), LoaderError> {
        let rows = sqlx::query(COLUMNS)
            .bind(Self::schema_of(table))
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LoaderError::catalog_access(table, e))?;

        if rows.is_empty() {
            return Err(LoaderError::catalog_access(table, "table not found"));
        }

        let columns = rows
            .iter()
            .map(|row| -> Result<ColumnSchema, sqlx::Error> {
                let name: String = row.try_get("column_name")?;
                Ok(ColumnSchema {
                    name: normalize_identifier(&name),
                    data_type: row.try_get("data_type")?,
                    is_nullable: row.try_get::<String, _>("is_nullable")? == "YES",
                    default: row.try_get("column_default")?,
                    size: row.try_get("size")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| LoaderError::catalog_access(table, e))?;

        let primary_key = self
            .key_columns(table, "PRIMARY KEY")
            .await?
            .into_iter()
            .map(|(_, column)| column)
            .collect();

        Ok((columns, primary_key))
    }

    async fn foreign_key_columns(
        &self,
        table: &TableId,
    ) -> Result<Vec<ForeignKeyColumn>, LoaderError> {
        let rows = sqlx::query(FOREIGN_KEYS)
            .bind(Self::schema_of(table))
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LoaderError::catalog_access(table, e))?;

        rows.iter()
            .map(|row| -> Result<ForeignKeyColumn, sqlx::Error> {
                let constraint: String = row.try_get("constraint_name")?;
                let column: String = row.try_get("column_name")?;
                let schema: String = row.try_get("referenced_schema")?;
                let parent: String = row.try_get("referenced_table")?;
                let parent_column: String = row.try_get("referenced_column")?;
                let current: Option<String> = row.try_get("current_schema")?;
                let parent_table = referenced_table(
                    table,
                    normalize_identifier(&schema),
                    normalize_identifier(&parent),
                    current.as_deref(),
                );
                Ok(ForeignKeyColumn {
                    constraint: normalize_constraint_name(&constraint),
                    column: normalize_identifier(&column),
                    referenced_table: parent_table,
                    referenced_column: normalize_identifier(&parent_column),
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| LoaderError::catalog_access(table, e))
    }

    async fn unique_constraints(
        &self,
        table: &TableId,
    ) -> Result<Vec<UniqueConstraint>, LoaderError> {
        let rows = self.key_columns(table, "UNIQUE").await?;
        Ok(group_unique_constraints(rows))
    }

    fn vendor_capabilities(&self) -> Vec<String> {
        vec!["PK::Auto::MySQL".to_string()]
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
