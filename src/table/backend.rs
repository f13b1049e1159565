use anyhow::anyhow;
use log::trace;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::database::SqliteStore;
use super::models::Table;
use crate::common::errors::Result;

/// Storage for one table. Factors and CPTs own their backend exclusively; no transactional
/// guarantees are assumed.
pub trait TableBackend: Send + Sync + Debug {
    /// The full table. Idempotent and side-effect free.
    fn read(&self) -> Result<Table>;

    /// Overwrite the stored table.
    fn write(&self, table: &Table) -> Result<()>;

    /// Opaque persistence location, threaded through to derived tables.
    fn storage_location(&self) -> Option<&Path>;

    /// New backend of the same kind, at the same location, holding `table`.
    fn derive(&self, table: Table) -> Result<SharedTable>;
}

pub type SharedTable = Arc<dyn TableBackend>;

/// Table held in process memory.
#[derive(Debug)]
pub struct InMemoryTable {
    table: RwLock<Table>,
    location: Option<PathBuf>,
}

impl InMemoryTable {
    pub fn new(table: Table, location: Option<PathBuf>) -> Self {
        Self {
            table: RwLock::new(table),
            location,
        }
    }

    pub fn shared(table: Table, location: Option<PathBuf>) -> SharedTable {
        Arc::new(Self::new(table, location))
    }
}

impl TableBackend for InMemoryTable {
    fn read(&self) -> Result<Table> {
        let table = self
            .table
            .read()
            .map_err(|_| anyhow!("in-memory table lock poisoned"))?;
        Ok(table.clone())
    }

    fn write(&self, table: &Table) -> Result<()> {
        let mut guard = self
            .table
            .write()
            .map_err(|_| anyhow!("in-memory table lock poisoned"))?;
        *guard = table.clone();
        Ok(())
    }

    fn storage_location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn derive(&self, table: Table) -> Result<SharedTable> {
        trace!("deriving in-memory table with {} rows", table.len());
        Ok(InMemoryTable::shared(table, self.location.clone()))
    }
}

/// Chooses which backend new tables land in.
#[derive(Debug, Clone)]
pub enum Storage {
    InMemory { location: Option<PathBuf> },
    Sqlite(SqliteStore),
}

impl Default for Storage {
    fn default() -> Self {
        Storage::in_memory()
    }
}

impl Storage {
    pub fn in_memory() -> Self {
        Storage::InMemory { location: None }
    }

    pub fn sqlite_in_memory() -> Result<Self> {
        Ok(Storage::Sqlite(SqliteStore::new_in_memory()?))
    }

    pub fn sqlite_file(path: &str) -> Result<Self> {
        Ok(Storage::Sqlite(SqliteStore::new(path)?))
    }

    /// Wrap `table` in a fresh backend.
    pub fn create(&self, table: Table) -> Result<SharedTable> {
        match self {
            Storage::InMemory { location } => Ok(InMemoryTable::shared(table, location.clone())),
            Storage::Sqlite(store) => Ok(Arc::new(store.create_table(&table)?)),
        }
    }

    pub fn location(&self) -> Option<&Path> {
        match self {
            Storage::InMemory { location } => location.as_deref(),
            Storage::Sqlite(store) => store.path(),
        }
    }
}
