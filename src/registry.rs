use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::errors::{LoadWarning, LoaderError};
use crate::models::entity::{Entity, Relationship};

/// Entities produced by one run, keyed by lower-cased table name and by
/// moniker. Iteration follows registration order.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
    by_table: HashMap<String, usize>,
    by_moniker: HashMap<String, usize>,
    warnings: Vec<LoadWarning>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `entity`, refusing to replace an existing moniker or table.
    pub fn register(&mut self, entity: Entity) -> Result<&Entity, LoaderError> {
        if let Some(&index) = self.by_moniker.get(&entity.moniker) {
            return Err(LoaderError::DuplicateMoniker {
                moniker: entity.moniker,
                table: entity.table.to_string(),
                existing: self.entities[index].table.to_string(),
            });
        }
        let key = entity.table.key();
        if self.by_table.contains_key(&key) {
            return Err(LoaderError::Config(format!(
                "table {} registered twice",
                entity.table
            )));
        }

        let index = self.entities.len();
        self.by_table.insert(key, index);
        self.by_moniker.insert(entity.moniker.clone(), index);
        self.entities.push(entity);
        Ok(&self.entities[index])
    }

    /// Lookup by table name, case-insensitive; schema-qualified tables use
    /// `schema.table`.
    pub fn get(&self, table: &str) -> Option<&Entity> {
        self.by_table
            .get(&table.to_lowercase())
            .map(|&index| &self.entities[index])
    }

    pub fn get_by_moniker(&self, moniker: &str) -> Option<&Entity> {
        self.by_moniker
            .get(moniker)
            .map(|&index| &self.entities[index])
    }

    pub fn moniker_for_table(&self, table: &str) -> Option<&str> {
        self.get(table).map(|entity| entity.moniker.as_str())
    }

    pub fn contains(&self, table: &str) -> bool {
        self.by_table.contains_key(&table.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    pub fn warn(&mut self, warning: LoadWarning) {
        self.warnings.push(warning);
    }

    pub fn relationship_count(&self) -> usize {
        self.entities
            .iter()
            .map(|entity| entity.relationships.len())
            .sum()
    }

    /// Attaches `belongs_to` to the child and `has_many` to the parent, or
    /// neither. Returns the reason when the pair cannot be declared.
    pub fn declare_pair(
        &mut self,
        child_key: &str,
        belongs_to: Relationship,
        parent_key: &str,
        has_many: Relationship,
    ) -> Result<(), String> {
        let child = *self
            .by_table
            .get(child_key)
            .ok_or_else(|| format!("no entity for table {}", child_key))?;
        let parent = *self
            .by_table
            .get(parent_key)
            .ok_or_else(|| format!("no entity for table {}", parent_key))?;

        if self.entities[child].has_relationship(&belongs_to.name) {
            return Err(format!(
                "{} already has a relationship named {}",
                self.entities[child].moniker, belongs_to.name
            ));
        }
        if self.entities[parent].has_relationship(&has_many.name) {
            return Err(format!(
                "{} already has a relationship named {}",
                self.entities[parent].moniker, has_many.name
            ));
        }
        if child == parent && belongs_to.name == has_many.name {
            return Err(format!(
                "{} would declare {} on both sides",
                self.entities[child].moniker, belongs_to.name
            ));
        }

        self.entities[child].relationships.push(belongs_to);
        self.entities[parent].relationships.push(has_many);
        Ok(())
    }
}

impl Serialize for EntityRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.entities
                .iter()
                .map(|entity| (entity.table.key(), entity)),
        )
    }
}
