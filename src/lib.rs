//! Database catalog introspection into an entity model.
//!
//! [`SchemaLoader`] reads tables, columns, primary keys and foreign keys
//! through a [`db::CatalogReader`], registers one [`Entity`] per accepted
//! table and infers belongs-to / has-many pairs from the foreign keys.

pub mod builder;
pub mod config;
pub mod db;
pub mod errors;
pub mod loader;
pub mod models;
pub mod naming;
pub mod registry;
pub mod relationships;

pub use config::LoaderOptions;
pub use errors::{LoadWarning, LoaderError};
pub use loader::SchemaLoader;
pub use models::entity::Entity;
pub use registry::EntityRegistry;
