use anyhow::Result;
use log::info;

use super::setup::{CommandLineOptions, StorageType};
use crate::table::backend::Storage;

const DEFAULT_DB_PATH: &str = "bayesfactor.db";

/// Shared handles a scenario needs while building a network.
#[derive(Debug, Clone)]
pub struct ResourceContext {
    pub storage: Storage,
}

impl ResourceContext {
    pub fn new(options: &CommandLineOptions) -> Result<ResourceContext> {
        let storage = match options.storage_type {
            StorageType::InMemory => Storage::in_memory(),
            StorageType::Persistent => {
                let path = options.db_path.as_deref().unwrap_or(DEFAULT_DB_PATH);
                info!("storing tables in SQLite database {}", path);
                Storage::sqlite_file(path)?
            }
        };
        Ok(ResourceContext { storage })
    }

    pub fn new_in_memory() -> ResourceContext {
        ResourceContext {
            storage: Storage::in_memory(),
        }
    }

    pub fn new_with_file(path: &str) -> Result<ResourceContext> {
        Ok(ResourceContext {
            storage: Storage::sqlite_file(path)?,
        })
    }
}
