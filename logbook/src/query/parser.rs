//! Translator from query text to a validated, parameterized request.

use super::condition::{parse_predicates, try_parse_keyword, Predicate};
use crate::schema::{self, COLUMNS, LOGS_TABLE};

/// Rejections raised before any storage call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid command, expected select")]
    ExpectedSelect,

    #[error("no columns specified")]
    NoColumns,

    #[error("invalid command, expected from and table name")]
    ExpectedFromTable,

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}

/// A validated select against a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Requested columns, in output order. Never empty.
    pub columns: Vec<String>,
    /// Target table.
    pub table: String,
    /// Condition text as written, without the leading `where`.
    pub condition: Option<String>,
    /// Parsed form of `condition`.
    pub predicates: Vec<Predicate>,
    /// Row limit requested by the query itself.
    pub limit: Option<usize>,
}

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<String>,
}

/// Translate `select <cols> from <table> [conditions] [limit <n>]` into a
/// [`QueryRequest`].
pub fn translate(input: &str) -> Result<QueryRequest, QueryError> {
    let parts = tokenize(input);

    match parts.first() {
        Some((_, first)) if first.eq_ignore_ascii_case("select") => {}
        _ => return Err(QueryError::ExpectedSelect),
    }

    // Collect columns up to the `from` keyword
    let mut raw_columns = Vec::new();
    let mut i = 1;
    while i < parts.len() && !parts[i].1.eq_ignore_ascii_case("from") {
        raw_columns.push(parts[i].1);
        i += 1;
    }

    if raw_columns.is_empty() {
        return Err(QueryError::NoColumns);
    }

    // parts[i] is `from`; the table must follow it
    let (table_end, table) = match parts.get(i + 1) {
        Some((offset, table)) => (offset + table.len(), table.to_ascii_lowercase()),
        None => return Err(QueryError::ExpectedFromTable),
    };

    let columns = resolve_columns(&raw_columns)?;
    if table != LOGS_TABLE {
        return Err(QueryError::UnknownTable(table));
    }

    // Everything after the table is parsed from the raw text so quoted
    // values keep their exact contents.
    let mut rest = input[table_end..].trim();

    if let Some(after) = try_parse_keyword(rest, "where") {
        rest = after.trim_start();
        if rest.is_empty() || try_parse_keyword(rest, "limit").is_some() {
            return Err(QueryError::InvalidCondition("empty condition".to_string()));
        }
    }

    let no_condition = rest.is_empty() || try_parse_keyword(rest, "limit").is_some();
    let (condition, predicates, tail) = if no_condition {
        (None, Vec::new(), rest)
    } else {
        let (predicates, tail) = parse_predicates(rest)?;
        let text = rest[..rest.len() - tail.len()].trim_end().to_string();
        (Some(text), predicates, tail)
    };

    let limit = match try_parse_keyword(tail, "limit") {
        Some(count) => Some(parse_limit(&count.split_whitespace().collect::<Vec<_>>())?),
        None => None,
    };

    Ok(QueryRequest {
        columns,
        table,
        condition,
        predicates,
        limit,
    })
}

/// Split on whitespace, keeping each token's byte offset into `input`.
fn tokenize(input: &str) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in input.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                tokens.push((s, &input[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push((s, &input[s..]));
    }
    tokens
}

/// Lowercase and whitelist the requested columns, expanding `*`.
fn resolve_columns(raw: &[&str]) -> Result<Vec<String>, QueryError> {
    let mut columns = Vec::with_capacity(raw.len());
    for col in raw {
        // Accept comma separated lists too: `select ip, status from logs`
        for name in col.split(',').filter(|s| !s.is_empty()) {
            if name == "*" {
                columns.extend(COLUMNS.iter().map(|c| c.to_string()));
                continue;
            }
            let name = name.to_ascii_lowercase();
            if !schema::is_column(&name) {
                return Err(QueryError::UnknownColumn(name));
            }
            columns.push(name);
        }
    }

    if columns.is_empty() {
        return Err(QueryError::NoColumns);
    }
    Ok(columns)
}

fn parse_limit(tokens: &[&str]) -> Result<usize, QueryError> {
    match tokens {
        [n] => match n.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(QueryError::InvalidLimit(n.to_string())),
        },
        [] => Err(QueryError::InvalidLimit("missing row count".to_string())),
        more => Err(QueryError::InvalidLimit(more.join(" "))),
    }
}

impl QueryRequest {
    /// Build SQL with every condition value as a bound parameter.
    ///
    /// The row limit is the request's own limit capped at `max_rows`.
    pub fn compile(&self, max_rows: usize) -> CompiledQuery {
        let mut sql = format!("SELECT {} FROM {}", self.columns.join(", "), self.table);

        if !self.predicates.is_empty() {
            let clauses: Vec<String> = self.predicates.iter().map(Predicate::to_sql).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let limit = self.limit.map_or(max_rows, |l| l.min(max_rows));
        sql.push_str(&format!(" LIMIT {}", limit));

        CompiledQuery {
            sql,
            params: self.predicates.iter().map(|p| p.value.clone()).collect(),
        }
    }
}
