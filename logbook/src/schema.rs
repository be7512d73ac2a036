//! Schema definitions for the logs table.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Name of the single table holding parsed log lines.
pub const LOGS_TABLE: &str = "logs";

/// Stored columns, in insert and output order.
pub const COLUMNS: [&str; 6] = ["ip", "timestamp", "method", "url", "status", "user_agent"];

/// Maximum stored length of each text column, in characters.
pub const MAX_FIELD_LEN: usize = 255;

/// DDL for the logs table.
pub const CREATE_LOGS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS logs (
        ip VARCHAR(255),
        timestamp DATE,
        method VARCHAR(255),
        url VARCHAR(255),
        status VARCHAR(255),
        user_agent VARCHAR(255)
    )
"#;

/// Check whether `name` is a stored column.
pub fn is_column(name: &str) -> bool {
    COLUMNS.contains(&name)
}

/// A parsed access-log line. `None` means the field was not found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub ip: Option<String>,
    pub date: Option<NaiveDate>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub user_agent: Option<String>,
}

impl LogRecord {
    /// True when no field was populated.
    pub fn is_empty(&self) -> bool {
        self.ip.is_none()
            && self.date.is_none()
            && self.method.is_none()
            && self.url.is_none()
            && self.status.is_none()
            && self.user_agent.is_none()
    }

    /// Convert into the sink's positional row shape.
    pub fn into_row(self) -> Row {
        vec![
            Value::from(self.ip),
            self.date.map_or(Value::Null, Value::Date),
            Value::from(self.method),
            Value::from(self.url),
            Value::from(self.status),
            Value::from(self.user_agent),
        ]
    }
}

/// A single cell handed to the storage sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Date(NaiveDate),
    Null,
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map_or(Value::Null, Value::Text)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

/// Positional insert shape: one value per column in [`COLUMNS`] order.
pub type Row = Vec<Value>;

/// Why a row was refused at insert time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    Arity(usize),
    Type { column: &'static str, expected: &'static str },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::Arity(n) => write!(f, "expected {} values, got {}", COLUMNS.len(), n),
            ShapeError::Type { column, expected } => {
                write!(f, "column '{}' expects {}", column, expected)
            }
        }
    }
}

/// A row that passed the shape check, with text fields clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub ip: Option<String>,
    pub timestamp: Option<NaiveDate>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub user_agent: Option<String>,
}

impl TryFrom<&[Value]> for LogRow {
    type Error = ShapeError;

    fn try_from(row: &[Value]) -> Result<Self, Self::Error> {
        let [ip, timestamp, method, url, status, user_agent] = row else {
            return Err(ShapeError::Arity(row.len()));
        };

        Ok(Self {
            ip: text(ip, "ip")?,
            timestamp: date(timestamp, "timestamp")?,
            method: text(method, "method")?,
            url: text(url, "url")?,
            status: text(status, "status")?,
            user_agent: text(user_agent, "user_agent")?,
        })
    }
}

fn text(value: &Value, column: &'static str) -> Result<Option<String>, ShapeError> {
    match value {
        Value::Text(s) => Ok(Some(clamp(s))),
        Value::Null => Ok(None),
        Value::Date(_) => Err(ShapeError::Type {
            column,
            expected: "text",
        }),
    }
}

fn date(value: &Value, column: &'static str) -> Result<Option<NaiveDate>, ShapeError> {
    match value {
        Value::Date(d) => Ok(Some(*d)),
        Value::Null => Ok(None),
        Value::Text(_) => Err(ShapeError::Type {
            column,
            expected: "a date",
        }),
    }
}

/// Truncate to [`MAX_FIELD_LEN`] characters without splitting a code point.
pub fn clamp(s: &str) -> String {
    match s.char_indices().nth(MAX_FIELD_LEN) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
