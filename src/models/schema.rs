use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A table as named by the catalog: optional schema plus local name.
///
/// Equality and hashing ignore case, so `Sales.Orders` and `sales.orders`
/// refer to the same table.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TableId {
    pub schema: Option<String>,
    pub name: String,
}

impl TableId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        let schema = schema.into();
        Self {
            schema: if schema.is_empty() { None } else { Some(schema) },
            name: name.into(),
        }
    }

    /// `schema.name` when a schema is present, otherwise just the name.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// Lower-cased qualified name; the lookup key for every per-table map.
    pub fn key(&self) -> String {
        self.qualified_name().to_lowercase()
    }
}

impl PartialEq for TableId {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TableId {}

impl Hash for TableId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub size: Option<i64>,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, is_nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable,
            default: None,
            size: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

/// One catalog row of foreign-key metadata: a single child column of a
/// constraint and the parent column it points at.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForeignKeyColumn {
    pub constraint: String,
    pub column: String,
    pub referenced_table: TableId,
    pub referenced_column: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColumnPair {
    pub child: String,
    pub parent: String,
}

/// A foreign key reassembled from its catalog rows. More than one pair means
/// a composite key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForeignKeyConstraint {
    pub name: String,
    pub child: TableId,
    pub parent: TableId,
    pub pairs: Vec<ColumnPair>,
}

impl ForeignKeyConstraint {
    pub fn is_composite(&self) -> bool {
        self.pairs.len() > 1
    }
}
