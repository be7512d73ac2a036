//! lq: Log Query - CLI for ingesting and querying web-server access logs.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "lq")]
#[command(about = "Log Query - ingest and query web-server access logs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the logbook database
    Init {
        /// Re-initialize, deleting existing data
        #[arg(long)]
        force: bool,
    },

    /// Read all configured log sources and store their records
    #[command(visible_alias = "check-logs")]
    Ingest,

    /// Run a select query: select <cols> from logs [where <cond>] [limit <n>]
    #[command(visible_alias = "q")]
    Query {
        /// Query text, e.g. "select ip status from logs where status = 404"
        query: String,

        /// Output format: table, json
        #[arg(short = 'f', long = "format", default_value = "table")]
        format: String,
    },

    /// Retrieve stored logs with optional filters
    Logs {
        /// Only rows from this client address
        #[arg(long)]
        ip: Option<String>,

        /// Earliest date to include (YYYY-MM-DD)
        #[arg(long = "start-date")]
        start_date: Option<String>,

        /// Latest date to include (YYYY-MM-DD)
        #[arg(long = "end-date")]
        end_date: Option<String>,

        /// Count rows per value of this column
        #[arg(long = "group-by")]
        group_by: Option<String>,

        /// Output format: table, json
        #[arg(short = 'f', long = "format", default_value = "json")]
        format: String,
    },

    /// Manage configured log sources
    Sources {
        #[command(subcommand)]
        action: SourcesAction,
    },

    /// Interactive prompt accepting check_logs and select commands
    Shell,
}

#[derive(Subcommand)]
enum SourcesAction {
    /// List configured sources
    List,

    /// Add (or replace) a source
    Add {
        /// Path to the log file (relative paths resolve against LOGBOOK_ROOT)
        path: String,

        /// Directive tokens, e.g. "%h %t %r %>s %b"
        #[arg(default_value = "%h %t %r %>s %b")]
        format: String,
    },

    /// Remove a source by path
    Remove {
        path: String,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("LOGBOOK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { force } => commands::init(force),
        Commands::Ingest => commands::ingest(),
        Commands::Query { query, format } => commands::query(&query, &format),
        Commands::Logs { ip, start_date, end_date, group_by, format } => {
            commands::logs(ip, start_date.as_deref(), end_date.as_deref(), group_by, &format)
        }
        Commands::Sources { action } => match action {
            SourcesAction::List => commands::sources_list(),
            SourcesAction::Add { path, format } => commands::sources_add(&path, &format),
            SourcesAction::Remove { path } => commands::sources_remove(&path),
        },
        Commands::Shell => commands::shell(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
