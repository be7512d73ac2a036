//! Integration tests for lq CLI.

use std::process::{Command, Output};
use tempfile::TempDir;

const ACCESS_LOG: &str = concat!(
    "127.0.0.1 - - [10/Oct/2023:13:55:36 +0000] \"GET /index.html HTTP/1.1\" 200 1043\n",
    "10.0.0.2 - - [11/Oct/2023:08:00:00 +0000] \"GET /missing HTTP/1.1\" 404 12\n",
    "not an access log line\n",
    "127.0.0.1 - - [12/Oct/2023:09:30:00 +0000] \"POST /api/login HTTP/1.1\" 500 0\n",
);

fn lq_cmd(root: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lq"));
    cmd.env("LOGBOOK_ROOT", root);
    cmd.env_remove("LOGBOOK_LOG");
    cmd
}

fn lq(root: &std::path::Path, args: &[&str]) -> Output {
    lq_cmd(root).args(args).output().expect("failed to run lq")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn init_logbook(root: &std::path::Path) {
    let output = lq(root, &["init"]);
    assert!(output.status.success(), "lq init failed: {:?}", output);
}

/// Initialize, register the sample log and ingest it.
fn setup_ingested() -> TempDir {
    let tmp = TempDir::new().unwrap();
    init_logbook(tmp.path());
    std::fs::write(tmp.path().join("access.log"), ACCESS_LOG).unwrap();

    let output = lq(tmp.path(), &["sources", "add", "access.log"]);
    assert!(output.status.success(), "sources add failed: {:?}", output);

    let output = lq(tmp.path(), &["ingest"]);
    assert!(output.status.success(), "ingest failed: {:?}", output);
    tmp
}

#[test]
fn test_init() {
    let tmp = TempDir::new().unwrap();
    init_logbook(tmp.path());

    assert!(tmp.path().join("db/logbook.duckdb").exists());
    assert!(tmp.path().join("config.toml").exists());
}

#[test]
fn test_init_twice_is_harmless() {
    let tmp = TempDir::new().unwrap();
    init_logbook(tmp.path());

    let output = lq(tmp.path(), &["init"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("already initialized"));
}

#[test]
fn test_ingest_reports_summary() {
    let tmp = TempDir::new().unwrap();
    init_logbook(tmp.path());
    std::fs::write(tmp.path().join("access.log"), ACCESS_LOG).unwrap();
    lq(tmp.path(), &["sources", "add", "access.log", "%h %t %r %>s %b"]);

    let output = lq(tmp.path(), &["ingest"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("4 line(s)"), "unexpected summary: {}", out);
    assert!(out.contains("3 stored"), "unexpected summary: {}", out);
}

#[test]
fn test_ingest_missing_file_continues() {
    let tmp = TempDir::new().unwrap();
    init_logbook(tmp.path());
    std::fs::write(tmp.path().join("access.log"), ACCESS_LOG).unwrap();
    lq(tmp.path(), &["sources", "add", "gone.log"]);
    lq(tmp.path(), &["sources", "add", "access.log"]);

    let output = lq(tmp.path(), &["ingest"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("File not found"), "missing file not reported: {}", out);
    assert!(out.contains("3 stored"), "unexpected summary: {}", out);
}

#[test]
fn test_query_table_output() {
    let tmp = setup_ingested();

    let output = lq(tmp.path(), &["query", "select ip status from logs where status = 404"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("10.0.0.2"));
    assert!(out.contains("404"));
    assert!(!out.contains("127.0.0.1"));
    assert!(out.contains("(1 rows)"));
}

#[test]
fn test_query_json_output() {
    let tmp = setup_ingested();

    let output = lq(tmp.path(), &["query", "-f", "json", "select * from logs where ip = 127.0.0.1"]);
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["ip"], "127.0.0.1");
    assert!(records.iter().any(|r| r["timestamp"] == "2023-10-10"));
    assert!(records.iter().any(|r| r["url"] == "/api/login"));
}

#[test]
fn test_query_rejections() {
    let tmp = setup_ingested();

    let cases = [
        ("update x", "invalid command, expected select"),
        ("select from t", "no columns specified"),
        ("select a b", "invalid command, expected from and table name"),
    ];
    for (query, message) in cases {
        let output = lq(tmp.path(), &["query", query]);
        assert!(!output.status.success(), "{} should fail", query);
        let err = String::from_utf8_lossy(&output.stderr);
        assert!(err.contains(message), "expected '{}' in {}", message, err);
    }
}

#[test]
fn test_logs_filters() {
    let tmp = setup_ingested();

    let output = lq(
        tmp.path(),
        &["logs", "--ip", "127.0.0.1", "--start-date", "2023-10-11", "--end-date", "2023-10-31"],
    );
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "500");
}

#[test]
fn test_logs_group_by() {
    let tmp = setup_ingested();

    let output = lq(tmp.path(), &["logs", "--group-by", "ip"]);
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["ip"], "10.0.0.2");
    assert_eq!(records[0]["count"], "1");
    assert_eq!(records[1]["count"], "2");
}

#[test]
fn test_logs_rejects_bad_date() {
    let tmp = setup_ingested();

    let output = lq(tmp.path(), &["logs", "--start-date", "10/Oct/2023"]);
    assert!(!output.status.success());
}

#[test]
fn test_sources_list_and_remove() {
    let tmp = TempDir::new().unwrap();
    init_logbook(tmp.path());
    lq(tmp.path(), &["sources", "add", "a.log", "%h %t"]);

    let output = lq(tmp.path(), &["sources", "list"]);
    let out = stdout(&output);
    assert!(out.contains("%h %t"));
    assert!(out.contains("a.log"));
    assert!(out.contains("(missing)"));

    let output = lq(tmp.path(), &["sources", "remove", "a.log"]);
    assert!(output.status.success());
    let output = lq(tmp.path(), &["sources", "list"]);
    assert!(stdout(&output).contains("No sources configured."));
}

#[test]
fn test_sources_add_rejects_unknown_format() {
    let tmp = TempDir::new().unwrap();
    init_logbook(tmp.path());

    let output = lq(tmp.path(), &["sources", "add", "a.log", "%l %u"]);
    assert!(!output.status.success());
}

#[test]
fn test_query_before_init_fails() {
    let tmp = TempDir::new().unwrap();

    let output = lq(tmp.path(), &["query", "select ip from logs"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not initialized"));
}

#[test]
fn test_shell_session() {
    let tmp = TempDir::new().unwrap();
    init_logbook(tmp.path());
    std::fs::write(tmp.path().join("access.log"), ACCESS_LOG).unwrap();
    lq(tmp.path(), &["sources", "add", "access.log"]);

    let mut child = lq_cmd(tmp.path())
        .args(["shell"])
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .spawn()
        .expect("failed to spawn");

    {
        use std::io::Write;
        let stdin = child.stdin.as_mut().unwrap();
        stdin
            .write_all(b"check_logs\nselect url from logs where status = 200\nselect nothing\nhello\nexit\n")
            .unwrap();
    }

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("3 stored"), "ingest summary missing: {}", out);
    assert!(out.contains(r#"{"url":"/index.html"}"#), "select output missing: {}", out);
    assert!(out.contains("invalid command, expected from and table name"));
    assert!(out.contains("Unknown command"));
}
