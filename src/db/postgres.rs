use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::{
    errors::LoaderError,
    models::schema::{ColumnSchema, ForeignKeyColumn, TableId, UniqueConstraint},
};

use super::{
    group_unique_constraints, normalize_constraint_name, normalize_identifier, CatalogReader,
};

const DEFAULT_SCHEMA: &str = "public";

const LIST_TABLES: &str = r#"
    SELECT table_schema::text AS table_schema, table_name::text AS table_name
    FROM information_schema.tables
    WHERE table_type = 'BASE TABLE'
      AND (
        ($1 = '' AND table_schema NOT IN ('pg_catalog', 'information_schema'))
        OR table_schema = $1
      )
    ORDER BY table_schema, table_name
"#;

const COLUMNS: &str = r#"
    SELECT column_name::text AS column_name,
           data_type::text AS data_type,
           is_nullable::text AS is_nullable,
           column_default::text AS column_default,
           character_maximum_length::int4 AS size
    FROM information_schema.columns
    WHERE table_schema = $1 AND table_name = $2
    ORDER BY ordinal_position
"#;

const KEY_COLUMNS: &str = r#"
    SELECT tc.constraint_name::text AS constraint_name,
           kcu.column_name::text AS column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON kcu.constraint_schema = tc.constraint_schema
     AND kcu.constraint_name = tc.constraint_name
     AND kcu.table_name = tc.table_name
    WHERE tc.constraint_type = $3
      AND tc.table_schema = $1
      AND tc.table_name = $2
    ORDER BY tc.constraint_name, kcu.ordinal_position
"#;

const FOREIGN_KEYS: &str = r#"
    SELECT kcu.constraint_name::text AS constraint_name,
           kcu.column_name::text AS column_name,
           ukcu.table_schema::text AS referenced_schema,
           ukcu.table_name::text AS referenced_table,
           ukcu.column_name::text AS referenced_column
    FROM information_schema.referential_constraints rc
    JOIN information_schema.key_column_usage kcu
      ON kcu.constraint_schema = rc.constraint_schema
     AND kcu.constraint_name = rc.constraint_name
    JOIN information_schema.key_column_usage ukcu
      ON ukcu.constraint_schema = rc.unique_constraint_schema
     AND ukcu.constraint_name = rc.unique_constraint_name
     AND ukcu.ordinal_position = kcu.position_in_unique_constraint
    WHERE kcu.table_schema = $1 AND kcu.table_name = $2
    ORDER BY kcu.constraint_name, kcu.ordinal_position
"#;

pub struct PostgresCatalog {
    pub pool: PgPool,
}

impl PostgresCatalog {
    pub async fn connect(database_url: &str) -> Result<Self, LoaderError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| LoaderError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    fn schema_of(table: &TableId) -> &str {
        table.schema.as_deref().unwrap_or(DEFAULT_SCHEMA)
    }

    async fn key_columns(
        &self,
        table: &TableId,
        constraint_type: &str,
    ) -> Result<Vec<(String, String)>, LoaderError> {
        let rows = sqlx::query(KEY_COLUMNS)
            .bind(Self::schema_of(table))
            .bind(&table.name)
            .bind(constraint_type)
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

#[async_trait]
impl CatalogReader for PostgresCatalog {
    async fn list_tables(&self, schema: &str) -> Result<Vec<TableId>, LoaderError> {
        let rows = sqlx::query(LIST_TABLES)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(LoaderError::Sqlx)?;

        let tables = rows
            .iter()
            .map(|row| -> Result<TableId, sqlx::Error> {
                let schema: String = row.try_get("table_schema")?;
                let name: String = row.try_get("table_name")?;
                Ok(TableId::qualified(
                    normalize_identifier(&schema),
                    normalize_identifier(&name),
                ))
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
                    size: row.try_get::<Option<i32>, _>("size")?.map(i64::from),
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
                Ok(ForeignKeyColumn {
                    constraint: normalize_constraint_name(&constraint),
                    column: normalize_identifier(&column),
                    referenced_table: TableId::qualified(
                        normalize_identifier(&schema),
                        normalize_identifier(&parent),
                    ),
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
        vec!["PK::Auto::Pg".to_string()]
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
