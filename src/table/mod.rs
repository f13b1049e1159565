pub mod backend;
pub mod database;
pub mod models;

pub use backend::{InMemoryTable, SharedTable, Storage, TableBackend};
pub use database::{SqliteStore, SqliteTable};
pub use models::{Row, Table, VALUE_COLUMN, Value, ValueKind};
