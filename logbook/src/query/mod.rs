//! Restricted query language over the logs table.
//!
//! # Syntax Overview
//!
//! ```text
//! select <col> [<col> ...] from <table> [where] [<condition>] [limit <n>]
//! ```
//!
//! - **Columns**: any of `ip timestamp method url status user_agent`, or `*`
//! - **Table**: `logs`
//! - **Condition**: `<column> <op> <value>` joined with `and`
//! - **Operators**: `=`, `<>`/`!=`, `<`, `>`, `<=`, `>=`, `~=` (regex)
//! - **Values**: a bare word or `'single quoted text'`
//!
//! Conditions are compiled to bound parameters; nothing from the input other
//! than whitelisted column and table names reaches the SQL text.

mod condition;
mod parser;

pub use condition::{parse_condition, CompareOp, Predicate};
pub use parser::{translate, CompiledQuery, QueryError, QueryRequest};
