//! Store - handles writing and reading log rows.
//!
//! Uses DuckDB as the relational sink. A [`Store`] opens its connection on
//! first use, keeps it for its own lifetime and closes it on drop.

mod logs;

use std::cell::OnceCell;

use chrono::{NaiveDate, TimeDelta};
use duckdb::{params_from_iter, types::ValueRef, Connection};
use serde_json::{Map, Value as JsonValue};

use crate::query::{CompiledQuery, QueryRequest};
use crate::schema::{Row, CREATE_LOGS_TABLE};
use crate::{Config, Error, Result};

pub use logs::{InsertStats, LogFilter};

/// Storage operations the ingester and the query layer depend on.
pub trait LogSink {
    /// Insert a batch of rows. Rows failing the shape check are skipped and
    /// counted, not fatal.
    fn insert(&self, rows: &[Row]) -> Result<InsertStats>;

    /// Execute a validated query request.
    fn query(&self, request: &QueryRequest) -> Result<QueryResult>;
}

/// A logbook store for reading and writing log rows.
pub struct Store {
    config: Config,
    conn: OnceCell<Connection>,
}

impl Store {
    /// Open an existing logbook store. No connection is made yet.
    pub fn open(config: Config) -> Result<Self> {
        if !config.db_path().exists() {
            return Err(Error::NotInitialized(config.root.clone()));
        }
        Ok(Self {
            config,
            conn: OnceCell::new(),
        })
    }

    /// Get the DuckDB connection, opening it on first use.
    ///
    /// A failed open leaves the store unconnected; the next call retries.
    pub fn connection(&self) -> Result<&Connection> {
        if let Some(conn) = self.conn.get() {
            return Ok(conn);
        }

        let db_path = self.config.db_path();
        let conn = Connection::open(&db_path)?;
        conn.execute_batch(CREATE_LOGS_TABLE)?;
        tracing::debug!(path = %db_path.display(), "opened database");

        Ok(self.conn.get_or_init(|| conn))
    }

    /// Whether the connection has been opened yet.
    pub fn is_connected(&self) -> bool {
        self.conn.get().is_some()
    }

    /// Run a compiled query with its bound parameters.
    pub fn run(&self, compiled: &CompiledQuery) -> Result<QueryResult> {
        tracing::debug!(sql = %compiled.sql, params = ?compiled.params, "running query");

        let conn = self.connection()?;
        let mut stmt = conn.prepare(&compiled.sql)?;
        let mut rows_iter = stmt.query(params_from_iter(compiled.params.iter()))?;

        // Get column info from the rows iterator
        let column_count = rows_iter.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let column_names: Vec<String> = if let Some(row_ref) = rows_iter.as_ref() {
            (0..column_count)
                .map(|i| {
                    row_ref
                        .column_name(i)
                        .map(|s| s.to_string())
                        .unwrap_or_else(|_| format!("col{}", i))
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut result_rows = Vec::new();
        while let Some(row) = rows_iter.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(cell_to_string(row.get_ref(i)?));
            }
            result_rows.push(values);
        }

        Ok(QueryResult {
            columns: column_names,
            rows: result_rows,
        })
    }
}

impl LogSink for Store {
    fn insert(&self, rows: &[Row]) -> Result<InsertStats> {
        self.insert_rows(rows)
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        self.run(&request.compile(self.config.max_rows))
    }
}

/// Render a DuckDB value as text. `None` for SQL NULL.
fn cell_to_string(value: ValueRef<'_>) -> Option<String> {
    let text = match value {
        ValueRef::Null => return None,
        ValueRef::Boolean(b) => b.to_string(),
        ValueRef::TinyInt(n) => n.to_string(),
        ValueRef::SmallInt(n) => n.to_string(),
        ValueRef::Int(n) => n.to_string(),
        ValueRef::BigInt(n) => n.to_string(),
        ValueRef::HugeInt(n) => n.to_string(),
        ValueRef::UBigInt(n) => n.to_string(),
        ValueRef::Double(f) => f.to_string(),
        ValueRef::Date32(days) => {
            // Days since 1970-01-01
            NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| epoch.checked_add_signed(TimeDelta::days(days as i64)))
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| format!("<invalid date {}>", days))
        }
        ValueRef::Text(s) => String::from_utf8_lossy(s).to_string(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
        _ => "<complex>".to_string(),
    };
    Some(text)
}

/// Result of a query: column names plus positional rows.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    /// Zip each row with the column names, preserving column order.
    pub fn records(&self) -> Vec<Map<String, JsonValue>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(name, cell)| {
                        let value = cell.clone().map_or(JsonValue::Null, JsonValue::String);
                        (name.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
