use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    MySql,
    Sqlite,
}

impl DbType {
    /// Guesses the vendor from a connection URL scheme.
    pub fn from_url(database_url: &str) -> Option<Self> {
        let scheme = database_url.split(':').next()?.to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Some(DbType::Postgres),
            "mysql" | "mariadb" => Some(DbType::MySql),
            "sqlite" => Some(DbType::Sqlite),
            _ => None,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(DbType::Postgres),
            "mysql" | "mariadb" => Some(DbType::MySql),
            "sqlite" => Some(DbType::Sqlite),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectionConfig {
    pub db_type: DbType,
    pub database_url: String,
}

impl ConnectionConfig {
    pub fn new(db_type: DbType, database_url: impl Into<String>) -> Self {
        Self {
            db_type,
            database_url: database_url.into(),
        }
    }
}
