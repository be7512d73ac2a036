//! Log row storage operations.

use chrono::NaiveDate;
use duckdb::{params, Connection};

use super::{QueryResult, Store};
use crate::query::CompiledQuery;
use crate::schema::{self, LogRow, Row, COLUMNS};
use crate::{Error, Result};

/// Outcome of a batch insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertStats {
    pub inserted: usize,
    pub skipped: usize,
}

/// Service-facing retrieval filter. Each present field adds one clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Exact client address.
    pub ip: Option<String>,
    /// Inclusive lower bound on the log date.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on the log date.
    pub end_date: Option<NaiveDate>,
    /// Column to group by; results become `<column>, count` pairs.
    pub group_by: Option<String>,
}

impl LogFilter {
    /// Parse a `YYYY-MM-DD` filter date.
    pub fn parse_date(value: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| Error::InvalidFilter(format!("expected YYYY-MM-DD date, got '{}'", value)))
    }

    /// Build the parameterized retrieval query.
    pub fn compile(&self, max_rows: usize) -> Result<CompiledQuery> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(Error::InvalidFilter(format!(
                    "start date {} is after end date {}",
                    start, end
                )));
            }
        }

        let group_by = match self.group_by.as_deref() {
            Some(col) => {
                let col = col.to_ascii_lowercase();
                if !schema::is_column(&col) {
                    return Err(Error::InvalidFilter(format!("cannot group by '{}'", col)));
                }
                Some(col)
            }
            None => None,
        };

        let mut sql = match &group_by {
            Some(col) => format!("SELECT {}, COUNT(*) AS count FROM logs WHERE TRUE", col),
            None => format!("SELECT {} FROM logs WHERE TRUE", COLUMNS.join(", ")),
        };
        let mut params = Vec::new();

        if let Some(ip) = &self.ip {
            sql.push_str(" AND ip = ?");
            params.push(ip.clone());
        }
        if let Some(start) = self.start_date {
            sql.push_str(" AND timestamp >= CAST(? AS DATE)");
            params.push(start.to_string());
        }
        if let Some(end) = self.end_date {
            sql.push_str(" AND timestamp <= CAST(? AS DATE)");
            params.push(end.to_string());
        }
        if let Some(col) = &group_by {
            sql.push_str(&format!(" GROUP BY {} ORDER BY {}", col, col));
        }
        sql.push_str(&format!(" LIMIT {}", max_rows));

        Ok(CompiledQuery { sql, params })
    }
}

impl Store {
    /// Insert rows in a single transaction.
    ///
    /// Rows with the wrong arity or value types are skipped with a warning.
    /// Text fields are clamped to the column width before insert.
    pub fn insert_rows(&self, rows: &[Row]) -> Result<InsertStats> {
        let conn = self.connection()?;

        conn.execute("BEGIN TRANSACTION", [])?;

        match insert_rows_inner(conn, rows) {
            Ok(stats) => {
                if let Err(e) = conn.execute("COMMIT", []) {
                    // The connection outlives this call; never leave it mid-transaction
                    let _ = conn.execute("ROLLBACK", []);
                    return Err(e.into());
                }
                tracing::info!(inserted = stats.inserted, skipped = stats.skipped, "inserted log rows");
                Ok(stats)
            }
            Err(e) => {
                // Rollback on error
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Retrieve rows matching the filter, or grouped counts when
    /// `group_by` is set.
    pub fn retrieve_logs(&self, filter: &LogFilter) -> Result<QueryResult> {
        let compiled = filter.compile(self.config.max_rows)?;
        self.run(&compiled)
    }

    /// Count stored log rows.
    pub fn log_count(&self) -> Result<i64> {
        let conn = self.connection()?;
        let count = conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn insert_rows_inner(conn: &Connection, rows: &[Row]) -> Result<InsertStats> {
    let mut stmt = conn.prepare(
        "INSERT INTO logs (ip, timestamp, method, url, status, user_agent) VALUES (?, ?, ?, ?, ?, ?)",
    )?;
    let mut stats = InsertStats::default();

    for (index, row) in rows.iter().enumerate() {
        let log_row = match LogRow::try_from(row.as_slice()) {
            Ok(log_row) => log_row,
            Err(e) => {
                tracing::warn!(index, error = %e, row = ?row, "skipping malformed row");
                stats.skipped += 1;
                continue;
            }
        };

        stmt.execute(params![
            log_row.ip,
            log_row.timestamp.map(|d| d.to_string()),
            log_row.method,
            log_row.url,
            log_row.status,
            log_row.user_agent,
        ])?;
        stats.inserted += 1;
    }

    Ok(stats)
}
