//! Fixtures for koios integration tests.
//!
//! SQLite tests run everywhere against temp files. PostgreSQL tests need
//! `TEST_DATABASE_URL` and get a throwaway database that is dropped afterwards.

#![allow(dead_code)]

use std::path::Path;

use koios::connector::ConnectParams;
use tokio_postgres::{Client, NoTls};
use tokio_rusqlite::rusqlite;
use uuid::Uuid;

/// Creates a SQLite file at `path` holding a small `orders`/`customers` schema.
pub fn create_sqlite_fixture(path: &Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE orders (
             id INTEGER PRIMARY KEY,
             customer_id INTEGER REFERENCES customers(id),
             total REAL,
             note TEXT
         );
         INSERT INTO customers VALUES (1, 'Ada'), (2, 'Grace');
         INSERT INTO orders VALUES (10, 1, 9.5, NULL), (11, 2, 20.0, 'gift, wrapped');",
    )
    .unwrap();
}

pub fn sqlite_params(path: &Path) -> ConnectParams {
    ConnectParams::from([("file".to_string(), path.display().to_string())])
}

/// A PostgreSQL database that is dropped together with this value.
///
/// Each test gets its own database so tests can run in parallel.
pub struct TestDatabase {
    pub url: String,
    pub db_name: String,
    admin_url: String,
}

impl TestDatabase {
    pub async fn new(admin_url: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let admin_client = connect(admin_url).await?;

        let db_name = format!("koios_test_{}", Uuid::new_v4().simple());
        admin_client
            .execute(&format!("CREATE DATABASE {}", db_name), &[])
            .await?;

        let mut url = url::Url::parse(admin_url)?;
        url.set_path(&db_name);

        Ok(Self {
            url: url.to_string(),
            db_name,
            admin_url: admin_url.to_string(),
        })
    }

    pub async fn connect(&self) -> Result<Client, tokio_postgres::Error> {
        connect(&self.url).await
    }

    /// Connect parameters for the koios postgres driver.
    pub fn params(&self) -> ConnectParams {
        let url = url::Url::parse(&self.url).unwrap();
        let mut params = ConnectParams::new();
        params.insert("db".into(), self.db_name.clone());
        params.insert("host".into(), url.host_str().unwrap_or("localhost").into());
        if let Some(port) = url.port() {
            params.insert("port".into(), port.to_string());
        }
        if !url.username().is_empty() {
            params.insert("user".into(), url.username().into());
        }
        if let Some(password) = url.password() {
            let decoded = percent_encoding::percent_decode_str(password)
                .decode_utf8_lossy()
                .into_owned();
            params.insert("password".into(), decoded);
        }
        params
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        let admin_url = self.admin_url.clone();
        let db_name = self.db_name.clone();

        // The test's own runtime is blocked in this drop, so clean up on a fresh one.
        let _ = std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let Ok(client) = connect(&admin_url).await else {
                    return;
                };
                let _ = client
                    .execute(
                        &format!(
                            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
                            db_name
                        ),
                        &[],
                    )
                    .await;
                let _ = client
                    .execute(&format!("DROP DATABASE IF EXISTS {}", db_name), &[])
                    .await;
            })
        })
        .join();
    }
}

async fn connect(url: &str) -> Result<Client, tokio_postgres::Error> {
    let (client, connection) = tokio_postgres::connect(url, NoTls).await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("Test database connection error: {}", e);
        }
    });

    Ok(client)
}

/// `TEST_DATABASE_URL`, then `DATABASE_URL`, loading `.env` first if present.
pub fn get_test_database_url() -> Option<String> {
    let _ = dotenvy::dotenv();

    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}
