use anyhow::Result;
use libsql::{Builder, Connection};
use std::{path::Path, sync::Arc};
use tokio::sync::RwLock;

use crate::constants::DB_BUSY_TIMEOUT_MS;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id             TEXT    PRIMARY KEY,
    name           TEXT    UNIQUE NOT NULL,
    password_hash  TEXT    NOT NULL
);
"#;

const CREATE_USER_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id    TEXT PRIMARY KEY,
    name  TEXT NOT NULL,
    type  TEXT NOT NULL CHECK (type IN ('inflow', 'outflow'))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_name_type ON categories (LOWER(name), type);
CREATE TABLE IF NOT EXISTS transactions (
    id           TEXT PRIMARY KEY,
    date         TEXT NOT NULL,
    amount       REAL NOT NULL,
    category     TEXT NOT NULL,
    type         TEXT NOT NULL CHECK (type IN ('inflow', 'outflow')),
    description  TEXT
);
CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions (date);
CREATE TABLE IF NOT EXISTS budgets (
    id              TEXT PRIMARY KEY,
    category        TEXT NOT NULL,
    type            TEXT NOT NULL CHECK (type IN ('inflow', 'outflow')),
    planned_amount  REAL NOT NULL,
    period_start    TEXT NOT NULL,
    period_end      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_budgets_category_type ON budgets (category, type);
CREATE TABLE IF NOT EXISTS recurring_transactions (
    id              TEXT PRIMARY KEY,
    amount          REAL NOT NULL,
    category        TEXT NOT NULL,
    type            TEXT NOT NULL CHECK (type IN ('inflow', 'outflow')),
    description     TEXT,
    frequency       TEXT NOT NULL,
    start_date      TEXT NOT NULL,
    end_date        TEXT,
    is_active       INTEGER NOT NULL DEFAULT 1,
    last_generated  TEXT
);
"#;

pub type Db = Arc<RwLock<Connection>>;

/// Every request opens its own connection, so writers for the same file wait on
/// each other instead of failing with `database is locked`.
async fn configure_connection(conn: &Connection) -> Result<()> {
    // PRAGMAs answer with a row, so they go through `query`
    conn.query(&format!("PRAGMA busy_timeout = {}", DB_BUSY_TIMEOUT_MS), ())
        .await?;
    conn.query("PRAGMA journal_mode = WAL", ()).await?;
    Ok(())
}

/// Main users registry DB (users.db)
pub async fn init_main_db(data_dir: &str) -> Result<Db> {
    tokio::fs::create_dir_all(data_dir).await?;
    let path = Path::new(data_dir).join("users.db");
    let db = Builder::new_local(path).build().await?;
    let conn = db.connect()?;
    configure_connection(&conn).await?;

    conn.execute(CREATE_USERS_TABLE, ()).await?;
    Ok(Arc::new(RwLock::new(conn)))
}

/// Per-user isolated DB (user_{id}.db); every read and write for a user goes through it.
pub async fn get_user_db(data_dir: &str, user_id: &str) -> Result<Db> {
    tokio::fs::create_dir_all(data_dir).await?;
    let path = Path::new(data_dir).join(format!("user_{}.db", user_id));
    let db = Builder::new_local(path).build().await?;
    let conn = db.connect()?;
    configure_connection(&conn).await?;

    conn.execute_batch(CREATE_USER_SCHEMA).await?;
    Ok(Arc::new(RwLock::new(conn)))
}

pub async fn list_user_ids(main_db: &Db) -> Result<Vec<String>> {
    let conn = main_db.read().await;
    let mut rows = conn.query("SELECT id FROM users ORDER BY id", ()).await?;

    let mut ids = Vec::new();
    while let Some(row) = rows.next().await? {
        ids.push(row.get::<String>(0)?);
    }
    Ok(ids)
}

/// Reads a nullable TEXT column.
pub fn optional_text(row: &libsql::Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        libsql::Value::Null => Ok(None),
        libsql::Value::Text(text) => Ok(Some(text)),
        other => Err(anyhow::anyhow!(
            "expected TEXT or NULL in column {}, found {:?}",
            idx,
            other
        )),
    }
}

pub fn text_or_null(value: Option<&str>) -> libsql::Value {
    match value {
        Some(text) => libsql::Value::Text(text.to_string()),
        None => libsql::Value::Null,
    }
}
