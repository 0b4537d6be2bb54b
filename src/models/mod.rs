pub mod connections;
pub mod entity;
pub mod schema;
