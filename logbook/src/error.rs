//! Error types for logbook operations.

use std::path::PathBuf;

use crate::query::QueryError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("logbook not initialized at {0}")]
    NotInitialized(PathBuf),

    #[error("logbook already initialized at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("{0}")]
    Query(#[from] QueryError),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

pub type Result<T> = std::result::Result<T, Error>;
