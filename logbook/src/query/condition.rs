//! Condition clause grammar.
//!
//! ```text
//! condition := predicate (and predicate)*
//! predicate := <column> <op> <value>
//! ```
//!
//! A trailing `limit <n>` outside quotes ends the clause.

use chrono::NaiveDate;

use super::QueryError;
use crate::schema;

/// A single `column op value` test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Whitelisted column name.
    pub column: String,
    /// Comparison operator
    pub op: CompareOp,
    /// Literal bound as a query parameter.
    pub value: String,
}

/// Comparison operators for predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=` equals
    Eq,
    /// `<>` or `!=` not equals
    NotEq,
    /// `~=` regex match
    Regex,
    /// `>` greater than
    Gt,
    /// `<` less than
    Lt,
    /// `>=` greater or equal
    Gte,
    /// `<=` less or equal
    Lte,
}

impl Predicate {
    /// SQL fragment with a single `?` placeholder for the value.
    pub fn to_sql(&self) -> String {
        let is_date = self.column == "timestamp";
        match self.op {
            CompareOp::Regex if is_date => {
                format!("regexp_matches(CAST({} AS VARCHAR), ?)", self.column)
            }
            CompareOp::Regex => format!("regexp_matches({}, ?)", self.column),
            op if is_date => format!("{} {} CAST(? AS DATE)", self.column, op),
            op => format!("{} {} ?", self.column, op),
        }
    }
}

/// Parse a condition clause into predicates.
pub fn parse_condition(input: &str) -> Result<Vec<Predicate>, QueryError> {
    let (predicates, rest) = parse_predicates(input)?;
    if !rest.is_empty() {
        return Err(QueryError::InvalidCondition(format!("unexpected '{}'", rest)));
    }
    Ok(predicates)
}

/// Parse predicates up to the end of input or a `limit` keyword outside
/// quotes. Returns the unparsed tail, which is empty or starts at `limit`.
pub(super) fn parse_predicates(input: &str) -> Result<(Vec<Predicate>, &str), QueryError> {
    let mut predicates = Vec::new();
    let mut remaining = input.trim();

    if remaining.is_empty() {
        return Err(QueryError::InvalidCondition("empty condition".to_string()));
    }

    loop {
        let (predicate, rest) = parse_predicate(remaining)?;
        predicates.push(predicate);

        remaining = rest.trim();
        if remaining.is_empty() || try_parse_keyword(remaining, "limit").is_some() {
            break;
        }

        match try_parse_keyword(remaining, "and") {
            Some(rest) => remaining = rest.trim_start(),
            None => {
                return Err(QueryError::InvalidCondition(format!(
                    "unexpected '{}'",
                    remaining
                )))
            }
        }
    }

    Ok((predicates, remaining))
}

fn parse_predicate(input: &str) -> Result<(Predicate, &str), QueryError> {
    let (column, rest) = try_parse_identifier(input).ok_or_else(|| {
        QueryError::InvalidCondition(format!("expected column name at '{}'", input))
    })?;
    let column = column.to_ascii_lowercase();
    if !schema::is_column(&column) {
        return Err(QueryError::UnknownColumn(column));
    }

    let rest = rest.trim_start();
    let (op, rest) = try_parse_operator(rest).ok_or_else(|| {
        QueryError::InvalidCondition(format!("expected operator after '{}'", column))
    })?;

    let rest = rest.trim_start();
    let (value, rest) = try_parse_value(rest)?.ok_or_else(|| {
        QueryError::InvalidCondition(format!("expected value after '{} {}'", column, op))
    })?;

    if column == "timestamp" && op != CompareOp::Regex
        && NaiveDate::parse_from_str(&value, "%Y-%m-%d").is_err()
    {
        return Err(QueryError::InvalidCondition(format!(
            "timestamp expects a YYYY-MM-DD date, got '{}'",
            value
        )));
    }

    Ok((Predicate { column, op, value }, rest))
}

/// Try to parse a column identifier (`[A-Za-z_][A-Za-z0-9_]*`).
fn try_parse_identifier(input: &str) -> Option<(&str, &str)> {
    let first = input.chars().next()?;
    if !first.is_ascii_alphabetic() && first != '_' {
        return None;
    }

    let end = input
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '_')
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    Some((&input[..end], &input[end..]))
}

/// Try to parse a comparison operator.
fn try_parse_operator(input: &str) -> Option<(CompareOp, &str)> {
    // Check 2-char ops before 1-char
    let (op, op_len) = if input.starts_with("~=") {
        (CompareOp::Regex, 2)
    } else if input.starts_with("<>") || input.starts_with("!=") {
        (CompareOp::NotEq, 2)
    } else if input.starts_with(">=") {
        (CompareOp::Gte, 2)
    } else if input.starts_with("<=") {
        (CompareOp::Lte, 2)
    } else if input.starts_with('=') {
        (CompareOp::Eq, 1)
    } else if input.starts_with('>') {
        (CompareOp::Gt, 1)
    } else if input.starts_with('<') {
        (CompareOp::Lt, 1)
    } else {
        return None;
    };
    Some((op, &input[op_len..]))
}

/// Try to parse a value: `'quoted'` (with `''` as an escaped quote) or a bare word.
fn try_parse_value(input: &str) -> Result<Option<(String, &str)>, QueryError> {
    if let Some(quoted) = input.strip_prefix('\'') {
        let mut value = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '\'' {
                value.push(c);
                continue;
            }
            if let Some((_, '\'')) = chars.peek() {
                value.push('\'');
                chars.next();
                continue;
            }
            return Ok(Some((value, &quoted[i + 1..])));
        }
        return Err(QueryError::InvalidCondition(
            "unterminated quoted value".to_string(),
        ));
    }

    let end = input
        .char_indices()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    if end == 0 {
        return Ok(None);
    }
    Ok(Some((input[..end].to_string(), &input[end..])))
}

/// Match a case-insensitive keyword followed by whitespace or end of input.
pub(super) fn try_parse_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    let head = input.get(..keyword.len())?;
    let rest = &input[keyword.len()..];
    if head.eq_ignore_ascii_case(keyword) && (rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        Some(rest)
    } else {
        None
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "="),
            CompareOp::NotEq => write!(f, "<>"),
            CompareOp::Regex => write!(f, "~="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}
