//! Line parser: turns one raw access-log line into a [`LogRecord`].
//!
//! Directives are applied in their declared order. Each search starts where
//! the previous match ended, so a later directive never matches text an
//! earlier one already consumed (the `%>s` pattern would otherwise happily
//! match the first octet of the client address). A directive that does not
//! match leaves its field unset and the search position unchanged.
//!
//! Directive order must therefore follow the layout of the line. A format
//! listing `%>s` before `%h` takes the first digits of the address as the
//! status and then finds no address after it.

use chrono::{DateTime, NaiveDate};

use crate::format::{Directive, TIMESTAMP_FORMAT};
use crate::schema::LogRecord;

/// Parse a line against an ordered directive list.
///
/// Returns `None` when no directive produced a field.
pub fn parse_line(line: &str, directives: &[Directive]) -> Option<LogRecord> {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut record = LogRecord::default();
    let mut cursor = 0;

    for &directive in directives {
        if let Some(end) = apply(directive, line, cursor, &mut record) {
            cursor = end;
        }
    }

    if record.is_empty() {
        tracing::trace!(line, "no directive matched");
        None
    } else {
        Some(record)
    }
}

/// Run one directive from `start`. Returns the end of the match on success.
fn apply(directive: Directive, line: &str, start: usize, record: &mut LogRecord) -> Option<usize> {
    let pattern = directive.pattern();

    match directive {
        Directive::RequestLine => {
            let caps = pattern.captures_at(line, start)?;
            let end = caps.get(0)?.end();
            // Both groups are required; a partial capture is a miss for method and url.
            if let (Some(method), Some(url)) = (caps.get(1), caps.get(2)) {
                record.method = Some(method.as_str().to_string());
                record.url = Some(url.as_str().to_string());
            }
            Some(end)
        }
        Directive::Timestamp => {
            let m = pattern.find_at(line, start)?;
            record.date = parse_date(m.as_str());
            Some(m.end())
        }
        Directive::ClientIp | Directive::Status | Directive::Bytes => {
            let m = pattern.find_at(line, start)?;
            let value = Some(m.as_str().to_string());
            match directive {
                Directive::ClientIp => record.ip = value,
                Directive::Status => record.status = value,
                _ => record.user_agent = value,
            }
            Some(m.end())
        }
    }
}

/// Reduce a bracketed `%t` value to its calendar day in the line's own offset.
fn parse_date(bracketed: &str) -> Option<NaiveDate> {
    let inner = bracketed.trim_start_matches('[').trim_end_matches(']');
    match DateTime::parse_from_str(inner, TIMESTAMP_FORMAT) {
        Ok(ts) => Some(ts.date_naive()),
        Err(e) => {
            tracing::debug!(timestamp = inner, error = %e, "unparseable timestamp");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::LogFormat;

    const CLF_LINE: &str =
        r#"127.0.0.1 - - [10/Oct/2023:13:55:36 +0000] "GET /index.html HTTP/1.1" 200 1043"#;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    /// Build a line from a record by inverting the directive patterns.
    fn synthesize(record: &LogRecord, time: &str) -> String {
        format!(
            r#"{} - frank [{}:{}] "{} {} HTTP/1.0" {} {}"#,
            record.ip.as_deref().unwrap(),
            record.date.unwrap().format("%d/%b/%Y"),
            time,
            record.method.as_deref().unwrap(),
            record.url.as_deref().unwrap(),
            record.status.as_deref().unwrap(),
            record.user_agent.as_deref().unwrap(),
        )
    }

    #[test]
    fn test_common_log_format_line() {
        let record = parse_line(CLF_LINE, LogFormat::common().directives()).unwrap();
        assert_eq!(
            record,
            LogRecord {
                ip: Some("127.0.0.1".to_string()),
                date: date(2023, 10, 10),
                method: Some("GET".to_string()),
                url: Some("/index.html".to_string()),
                status: Some("200".to_string()),
                user_agent: Some("1043".to_string()),
            }
        );
    }

    #[test]
    fn test_unmatched_line_yields_none() {
        let format = LogFormat::common();
        assert!(parse_line("", format.directives()).is_none());
        assert!(parse_line("just some words", format.directives()).is_none());
        assert!(parse_line(CLF_LINE, &[]).is_none());
    }

    #[test]
    fn test_partial_format_leaves_other_fields_unset() {
        let record = parse_line(CLF_LINE, &[Directive::ClientIp, Directive::Status]).unwrap();
        assert_eq!(record.ip.as_deref(), Some("127.0.0.1"));
        // Status search starts after the address, so the first three-digit
        // token is the status code.
        assert_eq!(record.status.as_deref(), Some("200"));
        assert!(record.date.is_none());
        assert!(record.method.is_none());
        assert!(record.url.is_none());
        assert!(record.user_agent.is_none());
    }

    #[test]
    fn test_missing_directive_is_not_fatal() {
        let line = r#"10.1.2.3 - - [01/Jan/2024:00:00:01 +0000] "-" 400 0"#;
        let record = parse_line(line, LogFormat::common().directives()).unwrap();
        assert_eq!(record.ip.as_deref(), Some("10.1.2.3"));
        assert_eq!(record.date, date(2024, 1, 1));
        assert!(record.method.is_none());
        assert!(record.url.is_none());
        assert_eq!(record.status.as_deref(), Some("400"));
        assert_eq!(record.user_agent.as_deref(), Some("0"));
    }

    #[test]
    fn test_dash_byte_count_stays_unset() {
        let line = r#"10.1.2.3 - - [01/Jan/2024:00:00:01 +0000] "GET / HTTP/1.1" 304 -"#;
        let record = parse_line(line, LogFormat::common().directives()).unwrap();
        assert_eq!(record.status.as_deref(), Some("304"));
        assert!(record.user_agent.is_none());
    }

    #[test]
    fn test_timestamp_keeps_local_calendar_day() {
        let line = "[31/Dec/2023:23:30:00 -0700]";
        let record = parse_line(line, &[Directive::Timestamp]).unwrap();
        assert_eq!(record.date, date(2023, 12, 31));
    }

    #[test]
    fn test_invalid_timestamp_is_a_miss() {
        let line = "[31/Feb/2023:10:00:00 +0000] 10.0.0.1";
        let record = parse_line(line, &[Directive::Timestamp, Directive::ClientIp]).unwrap();
        assert!(record.date.is_none());
        assert_eq!(record.ip.as_deref(), Some("10.0.0.1"));

        assert!(parse_line("[31/Foo/2023:10:00:00 +0000]", &[Directive::Timestamp]).is_none());
    }

    #[test]
    fn test_only_timestamp_line() {
        let record = parse_line("[05/Mar/2022:08:00:00 +0100]", &[Directive::Timestamp]).unwrap();
        assert_eq!(record.date, date(2022, 3, 5));
        assert!(record.ip.is_none());
    }

    #[test]
    fn test_directive_order_follows_line_layout() {
        let line = r#"127.0.0.1 - - [10/Oct/2023:13:55:36 +0000] "GET /index.html HTTP/1.1" 200 1043"#;

        let record = parse_line(line, &[Directive::Status, Directive::ClientIp]).unwrap();
        assert_eq!(record.status.as_deref(), Some("127"));
        assert_eq!(record.ip, None);
    }

    #[test]
    fn test_trailing_newline_ignored() {
        let line = format!("{}\r\n", CLF_LINE);
        let record = parse_line(&line, LogFormat::common().directives()).unwrap();
        assert_eq!(record.user_agent.as_deref(), Some("1043"));
    }

    #[test]
    fn test_round_trip_synthesized_line() {
        let original = LogRecord {
            ip: Some("192.168.10.42".to_string()),
            date: date(2021, 7, 4),
            method: Some("DELETE".to_string()),
            url: Some("/api/items/17?force=true".to_string()),
            status: Some("204".to_string()),
            user_agent: Some("512".to_string()),
        };

        let line = synthesize(&original, "22:14:09 +0200");
        let parsed = parse_line(&line, LogFormat::common().directives()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_round_trip_drops_time_of_day() {
        let original = LogRecord {
            ip: Some("8.8.4.4".to_string()),
            date: date(2020, 2, 29),
            method: Some("GET".to_string()),
            url: Some("/".to_string()),
            status: Some("200".to_string()),
            user_agent: Some("7".to_string()),
        };

        for time in ["00:00:00 +0000", "23:59:59 -1200"] {
            let parsed = parse_line(&synthesize(&original, time), LogFormat::common().directives());
            assert_eq!(parsed.as_ref(), Some(&original));
        }
    }
}
