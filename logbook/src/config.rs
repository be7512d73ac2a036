//! Configuration for logbook.
//!
//! LOGBOOK_ROOT resolution order:
//! 1. Explicit path passed to Config::with_root()
//! 2. LOGBOOK_ROOT environment variable
//! 3. XDG data directory (e.g. ~/.local/share/logbook)

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::format::LogFormat;
use crate::{Error, Result};

/// A log file to ingest and the format its lines are written in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    /// Path to the log file. Relative paths resolve against the root.
    pub path: PathBuf,

    /// Directive tokens, e.g. `"%h %t %r %>s %b"`.
    pub format: LogFormat,
}

impl SourceConfig {
    pub fn new(path: impl Into<PathBuf>, format: LogFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }
}

/// logbook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for all logbook data.
    pub root: PathBuf,

    /// Upper bound on rows returned by any single query.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Log sources read by `ingest`.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

fn default_max_rows() -> usize {
    1_000
}

impl Config {
    /// Create a new config with the given root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_rows: default_max_rows(),
            sources: Vec::new(),
        }
    }

    /// Load config from LOGBOOK_ROOT/config.toml, or create default.
    pub fn load() -> Result<Self> {
        let root = resolve_root()?;
        Self::load_from(&root)
    }

    /// Load config from a specific root.
    pub fn load_from(root: &Path) -> Result<Self> {
        let config_path = root.join("config.toml");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let mut config: Config = toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
            // Ensure root matches the actual location
            config.root = root.to_path_buf();
            Ok(config)
        } else {
            Ok(Self::with_root(root))
        }
    }

    /// Save config to LOGBOOK_ROOT/config.toml.
    pub fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(self.config_path(), contents)?;
        Ok(())
    }

    /// Add a source, replacing any existing entry for the same path.
    pub fn add_source(&mut self, source: SourceConfig) {
        self.sources.retain(|s| s.path != source.path);
        self.sources.push(source);
    }

    /// Resolve a source path against the root.
    pub fn source_path(&self, source: &SourceConfig) -> PathBuf {
        if source.path.is_absolute() {
            source.path.clone()
        } else {
            self.root.join(&source.path)
        }
    }

    // Path helpers

    /// Path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to the DuckDB database file.
    pub fn db_path(&self) -> PathBuf {
        self.root.join("db/logbook.duckdb")
    }
}

/// Resolve LOGBOOK_ROOT using the standard resolution order.
fn resolve_root() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("LOGBOOK_ROOT") {
        return Ok(PathBuf::from(path));
    }

    if let Some(proj_dirs) = ProjectDirs::from("", "", "logbook") {
        return Ok(proj_dirs.data_dir().to_path_buf());
    }

    let home = std::env::var("HOME")
        .map_err(|_| Error::Config("Could not determine home directory".to_string()))?;
    Ok(PathBuf::from(home).join(".local/share/logbook"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Directive;
    use tempfile::TempDir;

    #[test]
    fn test_config_with_root() {
        let config = Config::with_root("/tmp/test-logbook");
        assert_eq!(config.root, PathBuf::from("/tmp/test-logbook"));
        assert_eq!(config.max_rows, 1_000);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_config_paths() {
        let config = Config::with_root("/tmp/test-logbook");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/test-logbook/db/logbook.duckdb"));
        assert_eq!(config.config_path(), PathBuf::from("/tmp/test-logbook/config.toml"));
    }

    #[test]
    fn test_source_path_resolution() {
        let config = Config::with_root("/srv/logbook");
        let rel = SourceConfig::new("logs/access.log", LogFormat::common());
        let abs = SourceConfig::new("/var/log/nginx/access.log", LogFormat::common());
        assert_eq!(config.source_path(&rel), PathBuf::from("/srv/logbook/logs/access.log"));
        assert_eq!(config.source_path(&abs), PathBuf::from("/var/log/nginx/access.log"));
    }

    #[test]
    fn test_add_source_replaces_same_path() {
        let mut config = Config::with_root("/tmp/test-logbook");
        config.add_source(SourceConfig::new("a.log", LogFormat::common()));
        config.add_source(SourceConfig::new(
            "a.log",
            LogFormat::new(vec![Directive::ClientIp]),
        ));
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].format.directives(), &[Directive::ClientIp]);
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();

        let mut config = Config::with_root(&root);
        config.max_rows = 50;
        config.add_source(SourceConfig::new("access.log", LogFormat::common()));
        config.save().unwrap();

        let loaded = Config::load_from(&root).unwrap();
        assert_eq!(loaded.max_rows, 50);
        assert_eq!(loaded.sources, config.sources);
    }

    #[test]
    fn test_load_parses_format_strings() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            r#"
root = "/elsewhere"

[[sources]]
path = "access.log"
format = "%h %t %r"
"#,
        )
        .unwrap();

        let loaded = Config::load_from(tmp.path()).unwrap();
        assert_eq!(loaded.root, tmp.path());
        assert_eq!(
            loaded.sources[0].format.directives(),
            &[Directive::ClientIp, Directive::Timestamp, Directive::RequestLine]
        );
    }

    #[test]
    fn test_load_rejects_format_without_directives() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "root = \"x\"\n[[sources]]\npath = \"a.log\"\nformat = \"%l %u\"\n",
        )
        .unwrap();

        let result = Config::load_from(tmp.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_returns_default() {
        let tmp = TempDir::new().unwrap();
        let loaded = Config::load_from(tmp.path()).unwrap();
        assert_eq!(loaded.max_rows, 1_000);
    }
}
