use serde::{Deserialize, Serialize};

use super::schema::{ColumnSchema, TableId, UniqueConstraint};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Child-to-parent lookup, declared on the table holding the foreign key.
    BelongsTo,
    /// Parent-to-children collection, declared on the referenced table.
    HasMany,
}

/// Equality between a column of the declaring entity and one of the
/// related entity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JoinColumn {
    pub local: String,
    pub foreign: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Relationship {
    pub name: String,
    pub kind: RelationKind,
    pub foreign_moniker: String,
    pub foreign_table: TableId,
    pub constraint: String,
    pub join: Vec<JoinColumn>,
}

/// Generated object-model unit for one table.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Entity {
    pub moniker: String,
    pub table: TableId,
    pub columns: Vec<ColumnSchema>,
    pub primary_key: Vec<String>,
    pub unique_constraints: Vec<UniqueConstraint>,
    /// Capability tags in application order, resolved by whatever consumes
    /// the registry.
    pub capabilities: Vec<String>,
    pub relationships: Vec<Relationship>,
}

impl Entity {
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|relationship| relationship.name == name)
    }

    pub fn has_relationship(&self, name: &str) -> bool {
        self.relationship(name).is_some()
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    pub fn belongs_to(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(|relationship| relationship.kind == RelationKind::BelongsTo)
    }

    pub fn has_many(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(|relationship| relationship.kind == RelationKind::HasMany)
    }
}
