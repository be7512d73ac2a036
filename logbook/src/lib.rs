//! logbook: access-log ingestion and query.
//!
//! Parses web-server access logs into structured rows, stores them in DuckDB
//! and answers a restricted `select ... from logs` query language.

pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod init;
pub mod line;
pub mod query;
pub mod schema;
pub mod store;

pub use config::{Config, SourceConfig};
pub use error::{Error, Result};
pub use format::{Directive, LogFormat};
pub use ingest::{IngestReport, IngestSummary, Ingester};
pub use line::parse_line;
pub use query::{translate, CompareOp, CompiledQuery, Predicate, QueryError, QueryRequest};
pub use schema::{LogRecord, Row, Value};
pub use store::{InsertStats, LogFilter, LogSink, QueryResult, Store};
