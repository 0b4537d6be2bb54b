use std::env;

use log::LevelFilter;
use schema_loader::models::connections::{ConnectionConfig, DbType};
use schema_loader::{LoaderError, LoaderOptions, SchemaLoader};

fn connection_from_env() -> Result<ConnectionConfig, LoaderError> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| LoaderError::Config("DATABASE_URL must be set".to_string()))?;
    let db_type = match env::var("DATABASE_TYPE") {
        Ok(name) => DbType::parse(&name)
            .ok_or_else(|| LoaderError::Config(format!("unknown DATABASE_TYPE {}", name)))?,
        Err(_) => DbType::from_url(&database_url).ok_or_else(|| {
            LoaderError::Config("cannot infer database type from DATABASE_URL".to_string())
        })?,
    };
    Ok(ConnectionConfig::new(db_type, database_url))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let options = match env::var("SCHEMA_LOADER_CONFIG") {
        Ok(path) => LoaderOptions::from_json_file(path)?,
        Err(_) => LoaderOptions::default(),
    };

    let level = if options.debug_logging {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let connection = connection_from_env()?;
    let loader = SchemaLoader::new(options)?;
    let registry = loader.run(&connection).await?;

    println!("{}", serde_json::to_string_pretty(&registry)?);
    Ok(())
}
