//! CLI command implementations.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use logbook::{
    init, translate, Config, Error, IngestSummary, Ingester, LogFilter, LogFormat, LogSink,
    QueryResult, SourceConfig, Store,
};

/// Widest value shown in table output before truncation.
const MAX_CELL_WIDTH: usize = 50;

/// Initialize the logbook root.
pub fn init(force: bool) -> logbook::Result<()> {
    let config = Config::load()?;

    if init::is_initialized(&config) {
        if force {
            let db_dir = config.root.join("db");
            if db_dir.exists() {
                std::fs::remove_dir_all(&db_dir)?;
                println!("Removed existing database at {}", db_dir.display());
            }
        } else {
            println!("logbook already initialized at {}", config.root.display());
            println!("Use --force to re-initialize (this will delete all data)");
            return Ok(());
        }
    }

    init::initialize(&config)?;
    println!("logbook initialized at {}", config.root.display());
    println!("Sources configured: {}", config.sources.len());

    Ok(())
}

/// Read every configured source and store the parsed records.
pub fn ingest() -> logbook::Result<()> {
    let config = Config::load()?;
    let store = Store::open(config.clone())?;
    run_ingest(&config, &store)
}

fn run_ingest(config: &Config, store: &Store) -> logbook::Result<()> {
    if config.sources.is_empty() {
        println!("No sources configured. Add one with: lq sources add <path> [format]");
        return Ok(());
    }

    let summary = Ingester::from_config(config).ingest(store)?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &IngestSummary) {
    for path in &summary.unavailable {
        println!("File not found: {}", path.display());
    }
    for path in &summary.failed {
        println!("Failed reading: {}", path.display());
    }
    println!(
        "Read {} file(s), {} line(s): {} record(s), {} stored, {} skipped",
        summary.files_read, summary.lines, summary.records, summary.inserted, summary.skipped
    );
}

/// Translate and run a select query.
pub fn query(text: &str, format: &str) -> logbook::Result<()> {
    // Reject malformed queries before touching storage
    let request = translate(text)?;

    let config = Config::load()?;
    let store = Store::open(config)?;
    let result = store.query(&request)?;
    print_result(&result, format)
}

/// Retrieve stored logs through the filter interface.
pub fn logs(
    ip: Option<String>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    group_by: Option<String>,
    format: &str,
) -> logbook::Result<()> {
    let filter = LogFilter {
        ip,
        start_date: start_date.map(LogFilter::parse_date).transpose()?,
        end_date: end_date.map(LogFilter::parse_date).transpose()?,
        group_by,
    };

    let config = Config::load()?;
    let store = Store::open(config)?;
    let result = store.retrieve_logs(&filter)?;
    print_result(&result, format)
}

/// List configured sources.
pub fn sources_list() -> logbook::Result<()> {
    let config = Config::load()?;

    if config.sources.is_empty() {
        println!("No sources configured.");
        return Ok(());
    }

    for source in &config.sources {
        let path = config.source_path(source);
        let marker = if path.exists() { "" } else { "  (missing)" };
        println!("{}  {}{}", source.format, source.path.display(), marker);
    }
    Ok(())
}

/// Add or replace a source.
pub fn sources_add(path: &str, format: &str) -> logbook::Result<()> {
    let format: LogFormat = format.parse()?;
    let mut config = load_initialized()?;

    config.add_source(SourceConfig::new(path, format.clone()));
    config.save()?;
    println!("Added source {} ({})", path, format);
    Ok(())
}

/// Remove a source by its configured path.
pub fn sources_remove(path: &str) -> logbook::Result<()> {
    let mut config = load_initialized()?;

    let before = config.sources.len();
    let target = PathBuf::from(path);
    config.sources.retain(|s| s.path != target);
    if config.sources.len() == before {
        return Err(Error::Config(format!("No source configured for {}", path)));
    }

    config.save()?;
    println!("Removed source {}", path);
    Ok(())
}

/// Line-oriented prompt: `check_logs` ingests, `select ...` queries.
pub fn shell() -> logbook::Result<()> {
    let config = Config::load()?;
    let store = Store::open(config.clone())?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        print!("# ");
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        match first_word(input).as_deref() {
            Some("exit") | Some("quit") => break,
            Some("check_logs") => {
                if let Err(e) = run_ingest(&config, &store) {
                    println!("{}", e);
                }
            }
            Some("select") => {
                let result = translate(input)
                    .map_err(Error::from)
                    .and_then(|request| store.query(&request));
                match result {
                    Ok(result) => {
                        for record in result.records() {
                            println!("{}", serde_json::Value::Object(record));
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
            None => {}
            Some(_) => println!("Unknown command"),
        }
    }

    Ok(())
}

fn first_word(input: &str) -> Option<String> {
    input.split_whitespace().next().map(|w| w.to_ascii_lowercase())
}

fn load_initialized() -> logbook::Result<Config> {
    let config = Config::load()?;
    if !init::is_initialized(&config) {
        return Err(Error::NotInitialized(config.root));
    }
    Ok(config)
}

fn print_result(result: &QueryResult, format: &str) -> logbook::Result<()> {
    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&result.records())
                .map_err(|e| Error::Storage(format!("Failed to serialize results: {}", e)))?;
            println!("{}", json);
            Ok(())
        }
        "table" => {
            print_table(result);
            Ok(())
        }
        other => Err(Error::Config(format!(
            "Unknown format '{}' (expected table or json)",
            other
        ))),
    }
}

fn print_table(result: &QueryResult) {
    if result.rows.is_empty() {
        println!("No results.");
        return;
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| display_cell(v.as_deref())).collect())
        .collect();

    // Calculate column widths
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, val) in row.iter().enumerate() {
            widths[i] = widths[i].max(val.chars().count());
        }
    }

    for (i, col) in result.columns.iter().enumerate() {
        print!("{:width$} ", col, width = widths[i]);
    }
    println!();

    for width in &widths {
        print!("{} ", "-".repeat(*width));
    }
    println!();

    for row in &cells {
        for (i, val) in row.iter().enumerate() {
            print!("{:width$} ", val, width = widths[i]);
        }
        println!();
    }

    println!("\n({} rows)", result.rows.len());
}

fn display_cell(value: Option<&str>) -> String {
    match value {
        None => "-".to_string(),
        Some(v) if v.chars().count() > MAX_CELL_WIDTH => {
            let head: String = v.chars().take(MAX_CELL_WIDTH - 3).collect();
            format!("{}...", head)
        }
        Some(v) => v.to_string(),
    }
}
