use schema_loader::db::sqlite::SqliteCatalog;
use schema_loader::db::CatalogReader;
use schema_loader::models::connections::{ConnectionConfig, DbType};
use schema_loader::models::entity::{JoinColumn, RelationKind};
use schema_loader::models::schema::TableId;
use schema_loader::{LoadWarning, LoaderError, LoaderOptions, SchemaLoader};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Executor, SqlitePool};

const SHOP_SCHEMA: &[&str] = &[
    "CREATE TABLE customers (
        id INTEGER PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        email TEXT UNIQUE
    )",
    "CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL REFERENCES customers (id),
        placed_at TEXT DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE shipments (
        order_id INTEGER NOT NULL,
        warehouse_code TEXT NOT NULL,
        PRIMARY KEY (order_id, warehouse_code)
    )",
    "CREATE TABLE shipment_items (
        id INTEGER PRIMARY KEY,
        order_id INTEGER,
        warehouse_code TEXT,
        sku TEXT,
        FOREIGN KEY (order_id, warehouse_code) REFERENCES shipments (order_id, warehouse_code)
    )",
    "CREATE TABLE refunds (
        id INTEGER PRIMARY KEY,
        order_id INTEGER REFERENCES orders
    )",
    "CREATE TABLE audit_log (message TEXT)",
    "CREATE TABLE usr_tmp (id INTEGER PRIMARY KEY)",
];

async fn create_schema(pool: &SqlitePool) {
    for statement in SHOP_SCHEMA {
        pool.execute(*statement).await.unwrap();
    }
}

async fn setup_catalog() -> SqliteCatalog {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    create_schema(&pool).await;
    SqliteCatalog { pool }
}

#[tokio::test]
async fn test_list_tables() {
    let catalog = setup_catalog().await;

    let tables = catalog.list_tables("").await.unwrap();
    assert_eq!(tables.len(), 7);
    assert!(tables.contains(&TableId::new("shipment_items")));
    assert!(tables.iter().all(|table| table.schema.is_none()));
}

#[tokio::test]
async fn test_columns_and_primary_key() {
    let catalog = setup_catalog().await;

    let (columns, primary_key) = catalog
        .columns_and_primary_key(&TableId::new("customers"))
        .await
        .unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "email"]);
    assert_eq!(primary_key, vec!["id".to_string()]);
    assert!(!columns[0].is_nullable);
    assert!(!columns[1].is_nullable);
    assert_eq!(columns[1].size, Some(100));
    assert!(columns[2].is_nullable);

    let (_, composite) = catalog
        .columns_and_primary_key(&TableId::new("shipments"))
        .await
        .unwrap();
    assert_eq!(composite, vec!["order_id", "warehouse_code"]);
}

#[tokio::test]
async fn test_missing_table_is_a_catalog_error() {
    let catalog = setup_catalog().await;

    let err = catalog
        .columns_and_primary_key(&TableId::new("ghosts"))
        .await
        .unwrap_err();
    assert!(matches!(err, LoaderError::CatalogAccess { .. }));
}

#[tokio::test]
async fn test_implicit_reference_resolves_to_primary_key() {
    let catalog = setup_catalog().await;

    let rows = catalog
        .foreign_key_columns(&TableId::new("refunds"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].column, "order_id");
    assert_eq!(rows[0].referenced_table, TableId::new("orders"));
    assert_eq!(rows[0].referenced_column, "id");
}

#[tokio::test]
async fn test_unique_constraints() {
    let catalog = setup_catalog().await;

    let uniques = catalog
        .unique_constraints(&TableId::new("customers"))
        .await
        .unwrap();
    assert_eq!(uniques.len(), 1);
    assert_eq!(uniques[0].columns, vec!["email".to_string()]);
}

#[tokio::test]
async fn test_load_shop_schema() {
    let catalog = setup_catalog().await;
    let loader = SchemaLoader::new(LoaderOptions::default()).unwrap();

    let registry = loader.load(&catalog).await.unwrap();

    assert_eq!(registry.len(), 7);
    assert_eq!(registry.moniker_for_table("shipment_items"), Some("ShipmentItems"));
    assert_eq!(
        registry.warnings(),
        &[LoadWarning::MissingPrimaryKey {
            table: "audit_log".to_string()
        }]
    );

    let orders = registry.get("orders").unwrap();
    let customer = orders.relationship("customer_id").unwrap();
    assert_eq!(customer.kind, RelationKind::BelongsTo);
    assert_eq!(customer.foreign_moniker, "Customers");
    assert!(orders.has_relationship("refunds"));
    assert_eq!(
        orders.column("placed_at").unwrap().default.as_deref(),
        Some("CURRENT_TIMESTAMP")
    );

    let customers = registry.get("customers").unwrap();
    let orders_rel = customers.relationship("orders").unwrap();
    assert_eq!(orders_rel.kind, RelationKind::HasMany);
    assert_eq!(orders_rel.foreign_moniker, "Orders");
    assert!(customers.capabilities.contains(&"PK::Auto::SQLite".to_string()));

    let items = registry.get("shipment_items").unwrap();
    let shipment = items.relationship("shipments").unwrap();
    assert_eq!(
        shipment.join,
        vec![
            JoinColumn {
                local: "order_id".to_string(),
                foreign: "order_id".to_string()
            },
            JoinColumn {
                local: "warehouse_code".to_string(),
                foreign: "warehouse_code".to_string()
            },
        ]
    );
    assert!(!items.has_relationship("order_id"));
    assert!(registry
        .get("shipments")
        .unwrap()
        .has_relationship("shipment_items"));

    let audit = registry.get("audit_log").unwrap();
    assert!(audit.primary_key.is_empty());
    assert!(audit.relationships.is_empty());

    catalog.close().await;
}

#[tokio::test]
async fn test_load_with_filters() {
    let catalog = setup_catalog().await;
    let options = LoaderOptions {
        table_exclude: Some("^usr_|^audit_".to_string()),
        ..LoaderOptions::default()
    };

    let registry = SchemaLoader::new(options)
        .unwrap()
        .load(&catalog)
        .await
        .unwrap();

    assert_eq!(registry.len(), 5);
    assert!(!registry.contains("usr_tmp"));
    assert!(!registry.contains("audit_log"));
    assert!(registry.warnings().is_empty());
}

#[tokio::test]
async fn test_excluded_parent_leaves_child_unrelated() {
    let catalog = setup_catalog().await;
    let options = LoaderOptions {
        table_exclude: Some("^customers$".to_string()),
        ..LoaderOptions::default()
    };

    let registry = SchemaLoader::new(options)
        .unwrap()
        .load(&catalog)
        .await
        .unwrap();

    let orders = registry.get("orders").unwrap();
    assert!(!orders.has_relationship("customer_id"));
    assert!(orders.has_relationship("refunds"));
}

#[tokio::test]
async fn test_run_against_database_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let url = format!("sqlite://{}", file.path().display());

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .unwrap();
    create_schema(&pool).await;
    pool.close().await;

    let loader = SchemaLoader::new(LoaderOptions::default()).unwrap();
    let registry = loader
        .run(&ConnectionConfig::new(DbType::Sqlite, url))
        .await
        .unwrap();

    let json = serde_json::to_value(&registry).unwrap();
    assert_eq!(json["orders"]["moniker"], "Orders");
    assert_eq!(json["orders"]["relationships"][0]["kind"], "belongs_to");
    assert_eq!(json["customers"]["primary_key"][0], "id");
}

#[tokio::test]
async fn test_dangling_implicit_reference_is_tolerated() {
    let catalog = setup_catalog().await;
    catalog
        .pool
        .execute(
            "CREATE TABLE notes (
                id INTEGER PRIMARY KEY,
                legacy_id INTEGER REFERENCES legacy,
                customer_id INTEGER REFERENCES customers (id)
            )",
        )
        .await
        .unwrap();

    let rows = catalog
        .foreign_key_columns(&TableId::new("notes"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].column, "customer_id");

    let registry = SchemaLoader::new(LoaderOptions::default())
        .unwrap()
        .load(&catalog)
        .await
        .unwrap();

    assert_eq!(registry.len(), 8);
    let notes = registry.get("notes").unwrap();
    assert!(notes.has_relationship("customer_id"));
    assert!(!notes.has_relationship("legacy_id"));
    assert!(registry.get("orders").unwrap().has_relationship("customer_id"));
    assert!(registry.get("customers").unwrap().has_relationship("notes"));
}
