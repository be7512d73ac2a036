//! logbook initialization - creates directory structure and database.

use std::fs;

use crate::schema::CREATE_LOGS_TABLE;
use crate::{Config, Error, Result};

/// Initialize a new logbook root.
///
/// Creates the directory structure, the DuckDB database with the `logs`
/// table, and writes the config file.
pub fn initialize(config: &Config) -> Result<()> {
    if config.db_path().exists() {
        return Err(Error::AlreadyInitialized(config.root.clone()));
    }

    create_directories(config)?;
    init_database(config)?;
    config.save()?;

    tracing::info!(root = %config.root.display(), "initialized logbook");
    Ok(())
}

/// Check whether a root has been initialized.
pub fn is_initialized(config: &Config) -> bool {
    config.db_path().exists()
}

fn create_directories(config: &Config) -> Result<()> {
    if let Some(db_dir) = config.db_path().parent() {
        fs::create_dir_all(db_dir)?;
    }
    Ok(())
}

fn init_database(config: &Config) -> Result<()> {
    let conn = duckdb::Connection::open(config.db_path())?;
    conn.execute_batch(CREATE_LOGS_TABLE)?;
    Ok(())
}
