use std::collections::HashSet;

use async_trait::async_trait;
use log::warn;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

use crate::{
    errors::LoaderError,
    models::schema::{ColumnSchema, ForeignKeyColumn, TableId, UniqueConstraint},
};

use super::{normalize_identifier, CatalogReader};

const LIST_TABLES: &str = r#"
    SELECT name FROM sqlite_master
    WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
    ORDER BY name
"#;

const COLUMNS: &str = r#"
    SELECT name, type, "notnull", dflt_value, pk
    FROM pragma_table_info(?)
    ORDER BY cid
"#;

const FOREIGN_KEYS: &str = r#"
    SELECT id, seq, "table", "from", "to"
    FROM pragma_foreign_key_list(?)
    ORDER BY id, seq
"#;

const UNIQUE_INDEXES: &str = r#"
    SELECT il.name AS index_name, ii.name AS column_name
    FROM pragma_index_list(?) il
    JOIN pragma_index_info(il.name) ii
    WHERE il."unique" = 1 AND il.origin = 'u'
    ORDER BY il.seq, ii.seqno
"#;

/// SQLite has a single schema per connection, so tables are never qualified.
pub struct SqliteCatalog {
    pub pool: SqlitePool,
}

impl SqliteCatalog {
    pub async fn connect(database_url: &str) -> Result<Self, LoaderError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| LoaderError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Primary-key columns in key order, for foreign keys that reference the
    /// parent implicitly.
    async fn primary_key_of(&self, table: &str) -> Result<Vec<String>, LoaderError> {
        let rows = sqlx::query(COLUMNS)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LoaderError::catalog_access(table, e))?;

        let mut keyed = rows
            .iter()
            .map(|row| -> Result<(i64, String), sqlx::Error> {
                Ok((row.try_get("pk")?, row.try_get("name")?))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| LoaderError::catalog_access(table, e))?;
        keyed.retain(|(position, _)| *position > 0);
        keyed.sort_by_key(|(position, _)| *position);
        Ok(keyed.into_iter().map(|(_, name)| name).collect())
    }
}

/// `VARCHAR(100)` -> `Some(100)`; `NUMERIC(10, 2)` -> `Some(10)`.
fn declared_size(data_type: &str) -> Option<i64> {
    let open = data_type.find('(')?;
    data_type[open + 1..]
        .split(|c: char| c == ',' || c == ')')
        .next()?
        .trim()
        .parse()
        .ok()
}

#[async_trait]
impl CatalogReader for SqliteCatalog {
    async fn list_tables(&self, _schema: &str) -> Result<Vec<TableId>, LoaderError> {
        let rows = sqlx::query(LIST_TABLES)
            .fetch_all(&self.pool)
            .await
            .map_err(LoaderError::Sqlx)?;

        let tables = rows
            .iter()
            .map(|row| -> Result<TableId, sqlx::Error> {
                let name: String = row.try_get("name")?;
                Ok(TableId::new(normalize_identifier(&name)))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(tables)
    }

    async fn columns_and_primary_key(
        &self,
        table: &TableId,
    ) -> Result<(Vec<ColumnSchema>, Vec<String>), LoaderError> {
        let rows = sqlx::query(COLUMNS)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LoaderError::catalog_access(table, e))?;

        if rows.is_empty() {
            return Err(LoaderError::catalog_access(table, "table not found"));
        }

        let mut keyed = Vec::new();
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let decoded = (|| -> Result<(ColumnSchema, i64), sqlx::Error> {
                let name: String = row.try_get("name")?;
                let data_type: String = row.try_get("type")?;
                let not_null: i64 = row.try_get("notnull")?;
                let pk: i64 = row.try_get("pk")?;
                Ok((
                    ColumnSchema {
                        name: normalize_identifier(&name),
                        size: declared_size(&data_type),
                        data_type,
                        // INTEGER PRIMARY KEY is a rowid alias and never NULL
                        is_nullable: not_null == 0 && pk == 0,
                        default: row.try_get("dflt_value")?,
                    },
                    pk,
                ))
            })();
            let (column, pk) = decoded.map_err(|e| LoaderError::catalog_access(table, e))?;
            if pk > 0 {
                keyed.push((pk, column.name.clone()));
            }
            columns.push(column);
        }

        keyed.sort_by_key(|(position, _)| *position);
        let primary_key = keyed.into_iter().map(|(_, name)| name).collect();

        Ok((columns, primary_key))
    }

    async fn foreign_key_columns(
        &self,
        table: &TableId,
    ) -> Result<Vec<ForeignKeyColumn>, LoaderError> {
        let rows = sqlx::query(FOREIGN_KEYS)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LoaderError::catalog_access(table, e))?;

        let decoded = rows
            .into_iter()
            .map(
                |row| -> Result<(i64, i64, String, String, Option<String>), sqlx::Error> {
                    Ok((
                        row.try_get("id")?,
                        row.try_get("seq")?,
                        row.try_get("table")?,
                        row.try_get("from")?,
                        row.try_get("to")?,
                    ))
                },
            )
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| LoaderError::catalog_access(table, e))?;

        let mut foreign_keys = Vec::with_capacity(decoded.len());
        let mut unresolved: HashSet<i64> = HashSet::new();
        for (id, seq, parent, column, parent_column) in decoded {
            if unresolved.contains(&id) {
                continue;
            }
            let parent = normalize_identifier(&parent);

            // `REFERENCES parent` without a column list points at the
            // parent's primary key. SQLite accepts it even when the parent
            // is missing or has no key; such a constraint is dropped whole.
            let referenced_column = match parent_column {
                Some(name) => normalize_identifier(&name),
                None => {
                    let key = self.primary_key_of(&parent).await?;
                    match usize::try_from(seq).ok().and_then(|position| key.get(position)) {
                        Some(name) => name.clone(),
                        None => {
                            warn!(
                                "skipping foreign key {} on {}: cannot resolve implicit reference to {}",
                                id, table, parent
                            );
                            unresolved.insert(id);
                            continue;
                        }
                    }
                }
            };

            foreign_keys.push((
                id,
                ForeignKeyColumn {
                    constraint: format!("{}_fk{}", table.name.to_lowercase(), id),
                    column: normalize_identifier(&column),
                    referenced_table: TableId::new(parent),
                    referenced_column,
                },
            ));
        }

        let foreign_keys = foreign_keys
            .into_iter()
            .filter(|(id, _)| !unresolved.contains(id))
            .map(|(_, row)| row)
            .collect();

        Ok(foreign_keys)
    }

    async fn unique_constraints(
        &self,
        table: &TableId,
    ) -> Result<Vec<UniqueConstraint>, LoaderError> {
        let rows = sqlx::query(UNIQUE_INDEXES)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LoaderError::catalog_access(table, e))?;

        let rows = rows
            .iter()
            .map(|row| -> Result<(String, String), sqlx::Error> {
                let index: String = row.try_get("index_name")?;
                let column: String = row.try_get("column_name")?;
                Ok((index.to_lowercase(), normalize_identifier(&column)))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| LoaderError::catalog_access(table, e))?;

        Ok(super::group_unique_constraints(rows))
    }

    fn vendor_capabilities(&self) -> Vec<String> {
        vec!["PK::Auto::SQLite".to_string()]
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_size() {
        assert_eq!(declared_size("VARCHAR(100)"), Some(100));
        assert_eq!(declared_size("NUMERIC(10, 2)"), Some(10));
        assert_eq!(declared_size("INTEGER"), None);
        assert_eq!(declared_size("TEXT(abc)"), None);
    }
}
