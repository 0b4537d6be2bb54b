use log::{debug, warn};

use crate::config::{CapabilityExtensions, TableFilter};
use crate::db::CatalogReader;
use crate::errors::{LoadWarning, LoaderError};
use crate::models::entity::Entity;
use crate::models::schema::TableId;
use crate::naming::Namer;
use crate::registry::EntityRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Registered(String),
    /// Rejected by the include/exclude patterns.
    Skipped,
}

/// Creates one entity per accepted table and registers it.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    filter: TableFilter,
    namer: Namer,
    extensions: CapabilityExtensions,
    debug: bool,
}

impl EntityBuilder {
    pub fn new(
        filter: TableFilter,
        namer: Namer,
        extensions: CapabilityExtensions,
        debug: bool,
    ) -> Self {
        Self {
            filter,
            namer,
            extensions,
            debug,
        }
    }

    /// Building a table that is already registered returns its existing
    /// moniker without touching the catalog again.
    pub async fn build(
        &self,
        catalog: &dyn CatalogReader,
        table: &TableId,
        registry: &mut EntityRegistry,
    ) -> Result<BuildOutcome, LoaderError> {
        if !self.filter.accepts(table) {
            debug!("skipping table {}: filtered out", table);
            return Ok(BuildOutcome::Skipped);
        }
        if let Some(existing) = registry.get(&table.key()) {
            return Ok(BuildOutcome::Registered(existing.moniker.clone()));
        }

        let moniker = self.namer.moniker_for(table);
        if let Some(existing) = registry.get_by_moniker(&moniker) {
            return Err(LoaderError::DuplicateMoniker {
                moniker,
                table: table.to_string(),
                existing: existing.table.to_string(),
            });
        }

        let (columns, primary_key) = catalog.columns_and_primary_key(table).await?;
        let unique_constraints = catalog.unique_constraints(table).await?;

        if primary_key.is_empty() {
            let warning = LoadWarning::MissingPrimaryKey {
                table: table.to_string(),
            };
            warn!("{}", warning);
            registry.warn(warning);
        }

        let entity = Entity {
            moniker: moniker.clone(),
            table: table.clone(),
            columns,
            primary_key,
            unique_constraints,
            capabilities: self.extensions.ordered(&catalog.vendor_capabilities()),
            relationships: Vec::new(),
        };
        if self.debug {
            trace_entity(&entity);
        }

        registry.register(entity)?;
        Ok(BuildOutcome::Registered(moniker))
    }
}

fn trace_entity(entity: &Entity) {
    debug!("{}->table({})", entity.moniker, entity.table);
    if !entity.capabilities.is_empty() {
        debug!(
            "{}->load_components({})",
            entity.moniker,
            entity.capabilities.join(", ")
        );
    }
    let columns: Vec<String> = entity
        .columns
        .iter()
        .map(|column| {
            format!(
                "{} {}{}",
                column.name,
                column.data_type,
                if column.is_nullable { "" } else { " NOT NULL" }
            )
        })
        .collect();
    debug!("{}->add_columns({})", entity.moniker, columns.join(", "));
    debug!(
        "{}->set_primary_key({})",
        entity.moniker,
        entity.primary_key.join(", ")
    );
    for unique in &entity.unique_constraints {
        debug!(
            "{}->add_unique_constraint({} => [{}])",
            entity.moniker,
            unique.name,
            unique.columns.join(", ")
        );
    }
}
