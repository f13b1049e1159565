use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, trace};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::backend::{SharedTable, TableBackend};
use super::models::{Row, Table, Value};

/// Cell encoding used on disk. Floats are kept as text so that infinities (zero weights in
/// log space) and NaN survive the round trip, which plain JSON numbers cannot carry.
#[derive(Debug, Serialize, Deserialize)]
enum StoredCell {
    S(String),
    I(i64),
    F(String),
    B(bool),
    N,
}

impl From<&Value> for StoredCell {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(s) => StoredCell::S(s.clone()),
            Value::Integer(i) => StoredCell::I(*i),
            Value::Float(f) => StoredCell::F(f.to_string()),
            Value::Boolean(b) => StoredCell::B(*b),
            Value::Null => StoredCell::N,
        }
    }
}

impl StoredCell {
    fn into_value(self) -> Result<Value> {
        Ok(match self {
            StoredCell::S(s) => Value::String(s),
            StoredCell::I(i) => Value::Integer(i),
            StoredCell::F(text) => Value::Float(
                text.parse::<f64>()
                    .with_context(|| format!("Failed to parse stored float '{}'", text))?,
            ),
            StoredCell::B(b) => Value::Boolean(b),
            StoredCell::N => Value::Null,
        })
    }
}

/// SQLite-backed table storage shared by every table created through it.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    /// Connection pool for SQLite
    pool: Pool<SqliteConnectionManager>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Create a store in an in-memory SQLite database.
    pub fn new_in_memory() -> Result<Self> {
        // Each in-memory connection is its own database, so the pool holds exactly one and
        // never retires it.
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .context("Failed to create connection pool")?;

        let store = Self { pool, path: None };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create a store in a file-based SQLite database
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .context("Failed to create connection pool")?;

        let store = Self {
            pool,
            path: Some(PathBuf::from(path)),
        };
        store.initialize_schema()?;
        debug!("Opened table store at {}", path);
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.pool.get()
            .context("Failed to get connection from pool")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS tables (
                id TEXT PRIMARY KEY,
                columns TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables table")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS table_rows (
                table_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                cells TEXT NOT NULL,
                PRIMARY KEY (table_id, position),
                FOREIGN KEY (table_id) REFERENCES tables (id)
            )",
            [],
        )
        .context("Failed to create table_rows table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_table_rows_table_id ON table_rows (table_id)",
            [],
        )
        .context("Failed to create table_id index")?;

        // WAL only applies to file databases; in-memory ones ignore it.
        let _ = conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode");

        let _ = conn.pragma_update(None, "synchronous", "NORMAL")
            .context("Failed to set synchronous mode");

        conn.pragma_update(None, "foreign_keys", "ON")
            .context("Failed to enable foreign keys")?;

        Ok(())
    }

    /// Execute a function within a transaction.
    ///
    /// The transaction is committed if the closure returns Ok and rolled back otherwise.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T>,
    {
        let mut conn = self.pool.get()
            .context("Failed to get connection from pool")?;

        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Store `table` under a fresh id.
    pub fn create_table(&self, table: &Table) -> Result<SqliteTable> {
        let id = Uuid::new_v4().to_string();
        self.save_table(&id, table)?;
        Ok(SqliteTable {
            store: self.clone(),
            id,
        })
    }

    /// Insert or overwrite the table stored under `id`.
    pub fn save_table(&self, id: &str, table: &Table) -> Result<()> {
        let columns_json = serde_json::to_string(table.columns())
            .context("Failed to serialize table columns")?;

        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO tables (id, columns, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET columns = ?2, updated_at = ?3",
                params![id, columns_json, Utc::now().to_rfc3339()],
            )
            .context("Failed to upsert table")?;

            tx.execute("DELETE FROM table_rows WHERE table_id = ?1", params![id])
                .context("Failed to clear table rows")?;

            let mut stmt = tx.prepare(
                "INSERT INTO table_rows (table_id, position, cells) VALUES (?1, ?2, ?3)",
            )?;
            for (position, row) in table.rows().iter().enumerate() {
                let cells: Vec<StoredCell> = row.iter().map(StoredCell::from).collect();
                let cells_json = serde_json::to_string(&cells)
                    .context("Failed to serialize row")?;
                stmt.execute(params![id, position as i64, cells_json])
                    .context("Failed to insert row")?;
            }
            trace!("Saved table {} ({} rows)", id, table.len());
            Ok(())
        })
    }

    /// Load the table stored under `id`.
    pub fn load_table(&self, id: &str) -> Result<Table> {
        let conn = self.pool.get()
            .context("Failed to get connection from pool")?;

        let columns_json: String = conn
            .query_row(
                "SELECT columns FROM tables WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .with_context(|| format!("Table '{}' does not exist", id))?;
        let columns: Vec<String> = serde_json::from_str(&columns_json)
            .context("Failed to deserialize table columns")?;

        let mut stmt = conn.prepare(
            "SELECT cells FROM table_rows WHERE table_id = ?1 ORDER BY position",
        )?;
        let cell_rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;

        let mut rows: Vec<Row> = Vec::new();
        for cells_json in cell_rows {
            let cells: Vec<StoredCell> = serde_json::from_str(&cells_json?)
                .context("Failed to deserialize row")?;
            rows.push(
                cells
                    .into_iter()
                    .map(StoredCell::into_value)
                    .collect::<Result<Row>>()?,
            );
        }

        Table::from_rows(columns.as_slice(), rows).map_err(|e| anyhow::anyhow!(e))
    }

    /// Delete a stored table and its rows.
    pub fn delete_table(&self, id: &str) -> Result<bool> {
        self.with_transaction(|tx| {
            tx.execute("DELETE FROM table_rows WHERE table_id = ?1", params![id])
                .context("Failed to delete table rows")?;
            let deleted = tx
                .execute("DELETE FROM tables WHERE id = ?1", params![id])
                .context("Failed to delete table")?;
            Ok(deleted > 0)
        })
    }

    /// Ids of every stored table.
    pub fn table_ids(&self) -> Result<Vec<String>> {
        let conn = self.pool.get()
            .context("Failed to get connection from pool")?;
        let mut stmt = conn.prepare("SELECT id FROM tables ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    /// Handle on an already stored table.
    pub fn open_table(&self, id: &str) -> Result<SqliteTable> {
        // Fail early on unknown ids.
        self.load_table(id)?;
        Ok(SqliteTable {
            store: self.clone(),
            id: id.to_string(),
        })
    }
}

/// One table inside a [`SqliteStore`].
#[derive(Debug, Clone)]
pub struct SqliteTable {
    store: SqliteStore,
    id: String,
}

impl SqliteTable {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl TableBackend for SqliteTable {
    fn read(&self) -> crate::common::errors::Result<Table> {
        Ok(self.store.load_table(&self.id)?)
    }

    fn write(&self, table: &Table) -> crate::common::errors::Result<()> {
        Ok(self.store.save_table(&self.id, table)?)
    }

    fn storage_location(&self) -> Option<&Path> {
        self.store.path()
    }

    fn derive(&self, table: Table) -> crate::common::errors::Result<SharedTable> {
        Ok(Arc::new(self.store.create_table(&table)?))
    }
}
