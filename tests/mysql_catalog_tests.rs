use schema_loader::db::mysql::MySqlCatalog;
use schema_loader::db::CatalogReader;
use schema_loader::models::connections::{ConnectionConfig, DbType};
use schema_loader::models::schema::TableId;
use schema_loader::{LoaderOptions, SchemaLoader};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{Executor, MySqlPool};
use std::env;

const OTHER_DATABASE: &str = "loader_test_billing";

// Runs against the URL's default database; the same variable as
// DATABASE_URL would clash with the Postgres suite.
fn database_url() -> String {
    dotenv::dotenv().ok();
    env::var("MYSQL_DATABASE_URL").expect("MYSQL_DATABASE_URL must be set")
}

// WARN: tests share tables in the default database, run with --test-threads=1
async fn setup_test_db() -> MySqlPool {
    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .connect(&database_url())
        .await
        .expect("Failed to connect to the database");

    let statements = [
        "DROP TABLE IF EXISTS invoices",
        "DROP TABLE IF EXISTS shipment_items",
        "DROP TABLE IF EXISTS shipments",
        "DROP TABLE IF EXISTS orders",
        "DROP TABLE IF EXISTS customers",
        "DROP DATABASE IF EXISTS loader_test_billing",
        "CREATE DATABASE loader_test_billing",
        "CREATE TABLE loader_test_billing.customers (id INT PRIMARY KEY)",
        r#"CREATE TABLE customers (
            id INT AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            email VARCHAR(100),
            CONSTRAINT customers_email_key UNIQUE (email)
        )"#,
        r#"CREATE TABLE orders (
            id INT AUTO_INCREMENT PRIMARY KEY,
            customer_id INT NOT NULL,
            CONSTRAINT FK_Orders_Customer FOREIGN KEY (customer_id) REFERENCES customers (id)
        )"#,
        r#"CREATE TABLE shipments (
            order_id INT NOT NULL,
            warehouse_code VARCHAR(8) NOT NULL,
            PRIMARY KEY (order_id, warehouse_code)
        )"#,
        r#"CREATE TABLE shipment_items (
            id INT AUTO_INCREMENT PRIMARY KEY,
            order_id INT NOT NULL,
            warehouse_code VARCHAR(8) NOT NULL,
            CONSTRAINT fk_items_shipment FOREIGN KEY (order_id, warehouse_code)
                REFERENCES shipments (order_id, warehouse_code)
        )"#,
        r#"CREATE TABLE invoices (
            id INT AUTO_INCREMENT PRIMARY KEY,
            billing_customer_id INT NOT NULL,
            CONSTRAINT fk_invoices_billing FOREIGN KEY (billing_customer_id)
                REFERENCES loader_test_billing.customers (id)
        )"#,
    ];
    for statement in statements {
        pool.execute(statement).await.unwrap();
    }

    pool
}

#[tokio::test]
#[ignore = "requires MYSQL_DATABASE_URL"]
async fn test_list_tables_in_default_database() {
    let pool = setup_test_db().await;
    let catalog = MySqlCatalog { pool };

    let tables = catalog.list_tables("").await.unwrap();
    assert!(tables.contains(&TableId::new("orders")));
    assert!(tables.iter().all(|table| table.schema.is_none()));

    let billing = catalog.list_tables(OTHER_DATABASE).await.unwrap();
    assert_eq!(billing, vec![TableId::qualified(OTHER_DATABASE, "customers")]);
}

#[tokio::test]
#[ignore = "requires MYSQL_DATABASE_URL"]
async fn test_columns_and_primary_key() {
    let pool = setup_test_db().await;
    let catalog = MySqlCatalog { pool };

    let (columns, primary_key) = catalog
        .columns_and_primary_key(&TableId::new("customers"))
        .await
        .unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "email"]);
    assert_eq!(columns[1].data_type, "varchar(100)");
    assert_eq!(columns[1].size, Some(100));
    assert!(!columns[1].is_nullable);
    assert!(columns[2].is_nullable);
    assert_eq!(primary_key, vec!["id".to_string()]);

    let (_, composite) = catalog
        .columns_and_primary_key(&TableId::new("shipments"))
        .await
        .unwrap();
    assert_eq!(composite, vec!["order_id", "warehouse_code"]);
}

#[tokio::test]
#[ignore = "requires MYSQL_DATABASE_URL"]
async fn test_unqualified_child_references_unqualified_parent() {
    let pool = setup_test_db().await;
    let catalog = MySqlCatalog { pool };

    let rows = catalog
        .foreign_key_columns(&TableId::new("orders"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].constraint, "fk_orders_customer");
    assert_eq!(rows[0].referenced_table, TableId::new("customers"));
    assert!(rows[0].referenced_table.schema.is_none());
    assert_eq!(rows[0].referenced_column, "id");
}

#[tokio::test]
#[ignore = "requires MYSQL_DATABASE_URL"]
async fn test_composite_foreign_key_rows() {
    let pool = setup_test_db().await;
    let catalog = MySqlCatalog { pool };

    let rows = catalog
        .foreign_key_columns(&TableId::new("shipment_items"))
        .await
        .unwrap();
    let columns: Vec<&str> = rows.iter().map(|r| r.column.as_str()).collect();
    assert_eq!(columns, vec!["order_id", "warehouse_code"]);
    assert!(rows.iter().all(|r| r.constraint == "fk_items_shipment"));
    assert!(rows
        .iter()
        .all(|r| r.referenced_table == TableId::new("shipments")));
}

#[tokio::test]
#[ignore = "requires MYSQL_DATABASE_URL"]
async fn test_cross_database_parent_stays_qualified() {
    let pool = setup_test_db().await;
    let catalog = MySqlCatalog { pool };

    let rows = catalog
        .foreign_key_columns(&TableId::new("invoices"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].referenced_table,
        TableId::qualified(OTHER_DATABASE, "customers")
    );
}

#[tokio::test]
#[ignore = "requires MYSQL_DATABASE_URL"]
async fn test_run_loads_default_database() {
    setup_test_db().await;
    let options = LoaderOptions {
        table_include: Some("^(customers|orders|shipments|shipment_items|invoices)$".to_string()),
        ..LoaderOptions::default()
    };
    let loader = SchemaLoader::new(options).unwrap();

    let registry = loader
        .run(&ConnectionConfig::new(DbType::MySql, database_url()))
        .await
        .unwrap();

    assert_eq!(registry.len(), 5);
    assert!(registry.get("orders").unwrap().has_relationship("customer_id"));
    let customers = registry.get("customers").unwrap();
    assert!(customers.has_relationship("orders"));
    assert!(!customers.has_relationship("invoices"));
    assert!(!registry
        .get("invoices")
        .unwrap()
        .has_relationship("billing_customer_id"));
    assert!(registry
        .get("shipment_items")
        .unwrap()
        .has_relationship("shipments"));
    assert_eq!(customers.capabilities, vec!["PK::Auto::MySQL"]);
}
