use log::info;

use crate::builder::{BuildOutcome, EntityBuilder};
use crate::config::LoaderOptions;
use crate::db::{self, CatalogReader};
use crate::errors::LoaderError;
use crate::models::connections::ConnectionConfig;
use crate::registry::EntityRegistry;
use crate::relationships::RelationshipInference;

/// Runs one introspection pass: list tables, build entities, then infer
/// relationships. Each run gets a fresh registry.
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    options: LoaderOptions,
    builder: EntityBuilder,
    inference: RelationshipInference,
}

impl SchemaLoader {
    /// Validates `options`; a bad pattern or capability name fails here,
    /// before any connection is opened.
    pub fn new(options: LoaderOptions) -> Result<Self, LoaderError> {
        let filter = options.validate()?;
        let namer = options.namer();
        Ok(Self {
            builder: EntityBuilder::new(
                filter,
                namer.clone(),
                options.capability_extensions.clone(),
                options.debug_logging,
            ),
            inference: RelationshipInference::new(namer, options.debug_logging),
            options,
        })
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Opens the connection, loads, and closes the connection whether or not
    /// the load succeeded.
    pub async fn run(&self, connection: &ConnectionConfig) -> Result<EntityRegistry, LoaderError> {
        let catalog = db::connect(connection).await?;
        let result = self.load(catalog.as_ref()).await;
        catalog.close().await;
        result
    }

    pub async fn load(&self, catalog: &dyn CatalogReader) -> Result<EntityRegistry, LoaderError> {
        let tables = catalog.list_tables(&self.options.schema_name).await?;
        info!("found {} tables", tables.len());

        let mut registry = EntityRegistry::new();
        let mut skipped = 0;
        for table in &tables {
            if self.builder.build(catalog, table, &mut registry).await? == BuildOutcome::Skipped {
                skipped += 1;
            }
        }
        info!(
            "registered {} entities ({} tables filtered out)",
            registry.len(),
            skipped
        );

        if self.options.infer_relationships {
            let report = self.inference.infer_all(catalog, &mut registry).await?;
            info!(
                "declared {} relationships ({} unreachable, {} failed)",
                report.declared, report.skipped, report.failed
            );
        }

        Ok(registry)
    }
}
