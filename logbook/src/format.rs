//! Format directives and their extraction patterns.
//!
//! A log source declares its line layout as an ordered list of directive
//! tokens, for example the Common Log Format:
//!
//! ```text
//! %h %t %r %>s %b
//! ```
//!
//! | token | field(s)        | shape                                   |
//! |-------|-----------------|-----------------------------------------|
//! | `%h`  | ip              | dotted quad                             |
//! | `%t`  | date            | `[DD/Mon/YYYY:HH:MM:SS +ZZZZ]`          |
//! | `%r`  | method, url     | `"METHOD URL HTTP/1.x"`                 |
//! | `%>s` | status          | exactly three digits, word bounded      |
//! | `%b`  | user_agent      | one or more digits, word bounded        |

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;

static CLIENT_IP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap());
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\d{2}/[A-Za-z]{3}/\d{4}:\d{2}:\d{2}:\d{2} [+-]\d{4}\]").unwrap()
});
static REQUEST_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^ ]*) ([^ ]*) HTTP/1\.[01]""#).unwrap());
static STATUS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{3}\b").unwrap());
static BYTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\b").unwrap());

/// Date layout inside the `%t` brackets.
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One of the five supported format directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// `%h` remote host address.
    ClientIp,
    /// `%t` bracketed request time.
    Timestamp,
    /// `%r` quoted request line.
    RequestLine,
    /// `%>s` final status code.
    Status,
    /// `%b` response size, stored in the user_agent column.
    Bytes,
}

impl Directive {
    pub const ALL: [Directive; 5] = [
        Directive::ClientIp,
        Directive::Timestamp,
        Directive::RequestLine,
        Directive::Status,
        Directive::Bytes,
    ];

    /// Look up a directive by its token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "%h" => Some(Directive::ClientIp),
            "%t" => Some(Directive::Timestamp),
            "%r" => Some(Directive::RequestLine),
            "%>s" => Some(Directive::Status),
            "%b" => Some(Directive::Bytes),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Directive::ClientIp => "%h",
            Directive::Timestamp => "%t",
            Directive::RequestLine => "%r",
            Directive::Status => "%>s",
            Directive::Bytes => "%b",
        }
    }

    /// The compiled pattern locating this directive's text in a line.
    pub fn pattern(self) -> &'static Regex {
        match self {
            Directive::ClientIp => &CLIENT_IP,
            Directive::Timestamp => &TIMESTAMP,
            Directive::RequestLine => &REQUEST_LINE,
            Directive::Status => &STATUS,
            Directive::Bytes => &BYTES,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Ordered directives describing the lines of one log source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogFormat {
    directives: Vec<Directive>,
}

impl LogFormat {
    pub fn new(directives: Vec<Directive>) -> Self {
        Self { directives }
    }

    /// Common Log Format: `%h %t %r %>s %b`.
    pub fn common() -> Self {
        Self::new(Directive::ALL.to_vec())
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    /// Parse whitespace separated tokens. Tokens outside the supported set
    /// (such as `%l` or `%u`) are skipped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut directives = Vec::new();
        for token in s.split_whitespace() {
            match Directive::from_token(token) {
                Some(d) => directives.push(d),
                None => tracing::warn!(token, "skipping unsupported format directive"),
            }
        }

        if directives.is_empty() {
            return Err(Error::Config(format!(
                "format '{}' contains no supported directive (expected {})",
                s,
                Directive::ALL.map(Directive::token).join(" ")
            )));
        }

        Ok(Self { directives })
    }
}

impl TryFrom<String> for LogFormat {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LogFormat> for String {
    fn from(format: LogFormat) -> Self {
        format.to_string()
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self.directives.iter().map(|d| d.token()).collect();
        f.write_str(&tokens.join(" "))
    }
}
