//! Log ingestion: read configured sources, parse every line, and hand all
//! valid records to the sink in one batch.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::config::SourceConfig;
use crate::format::LogFormat;
use crate::line::parse_line;
use crate::schema::{LogRecord, Row};
use crate::store::LogSink;
use crate::{Config, Result};

/// Records collected from one pass over the sources.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub records: Vec<LogRecord>,
    /// Files fully read.
    pub files_read: usize,
    /// Files that were missing or could not be opened.
    pub unavailable: Vec<PathBuf>,
    /// Files that failed mid-read; their records were dropped.
    pub failed: Vec<PathBuf>,
    /// Lines read from fully read files.
    pub lines: usize,
}

/// Outcome of a full ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub files_read: usize,
    pub unavailable: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    pub lines: usize,
    pub records: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Reads a set of (path, format) sources.
#[derive(Debug, Clone)]
pub struct Ingester {
    sources: Vec<SourceConfig>,
}

enum SourceError {
    Unavailable(io::Error),
    Failed(io::Error),
}

impl Ingester {
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self { sources }
    }

    /// Build an ingester over the configured sources, resolving relative
    /// paths against the root.
    pub fn from_config(config: &Config) -> Self {
        let sources = config
            .sources
            .iter()
            .map(|s| SourceConfig::new(config.source_path(s), s.format.clone()))
            .collect();
        Self::new(sources)
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// Read and parse every source. Unreadable files are reported and
    /// skipped.
    pub fn read_logs(&self) -> IngestReport {
        let mut report = IngestReport::default();

        for source in &self.sources {
            match read_source(&source.path, &source.format) {
                Ok((records, lines)) => {
                    tracing::debug!(
                        path = %source.path.display(),
                        lines,
                        records = records.len(),
                        "read log file"
                    );
                    report.files_read += 1;
                    report.lines += lines;
                    report.records.extend(records);
                }
                Err(SourceError::Unavailable(e)) => {
                    tracing::warn!(path = %source.path.display(), error = %e, "log file unavailable");
                    report.unavailable.push(source.path.clone());
                }
                Err(SourceError::Failed(e)) => {
                    tracing::warn!(path = %source.path.display(), error = %e, "failed reading log file");
                    report.failed.push(source.path.clone());
                }
            }
        }

        report
    }

    /// Read all sources and submit the records to `sink` in a single insert.
    pub fn ingest(&self, sink: &impl LogSink) -> Result<IngestSummary> {
        let report = self.read_logs();
        let records = report.records.len();

        let rows: Vec<Row> = report.records.into_iter().map(LogRecord::into_row).collect();
        let stats = sink.insert(&rows)?;

        let summary = IngestSummary {
            files_read: report.files_read,
            unavailable: report.unavailable,
            failed: report.failed,
            lines: report.lines,
            records,
            inserted: stats.inserted,
            skipped: stats.skipped,
        };

        tracing::info!(
            files = summary.files_read,
            unavailable = summary.unavailable.len(),
            failed = summary.failed.len(),
            records = summary.records,
            inserted = summary.inserted,
            "ingestion complete"
        );
        Ok(summary)
    }
}

/// Parse one file. Returns its records and line count.
fn read_source(
    path: &Path,
    format: &LogFormat,
) -> std::result::Result<(Vec<LogRecord>, usize), SourceError> {
    let file = File::open(path).map_err(SourceError::Unavailable)?;
    let mut reader = BufReader::new(file);

    let mut records = Vec::new();
    let mut lines = 0;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(SourceError::Failed)?;
        if n == 0 {
            break;
        }
        lines += 1;

        let line = String::from_utf8_lossy(&buf);
        if let Some(record) = parse_line(&line, format.directives()) {
            records.push(record);
        }
    }

    Ok((records, lines))
}
