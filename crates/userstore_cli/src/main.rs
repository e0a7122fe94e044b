//! `userstore` executable.
//!
//! # Responsibility
//! - Parse configuration from flags/env.
//! - Initialize logging, open the store, and serve tool calls on stdio.
//!
//! # Invariants
//! - Schema initialization failure is fatal: exit non-zero before serving.
//! - Nothing but protocol traffic is written to stdout.

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use userstore_core::db::open_db;
use userstore_core::{default_log_level, init_logging};
use userstore_mcp::McpServer;

#[derive(Parser, Debug)]
#[command(
    name = "userstore",
    version,
    about = "User record store served as tools over stdio JSON-RPC"
)]
struct Cli {
    #[arg(
        long,
        env = "USERSTORE_DB_PATH",
        default_value = "users.db",
        help = "SQLite database file (created if missing)"
    )]
    db_path: PathBuf,
    #[arg(
        long,
        env = "USERSTORE_LOG_LEVEL",
        help = "Log level: trace|debug|info|warn|error (default: debug in debug builds, info otherwise)"
    )]
    log_level: Option<String>,
    #[arg(
        long,
        env = "USERSTORE_LOG_DIR",
        help = "Absolute directory for rolling log files (default: stderr)"
    )]
    log_dir: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("userstore: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let level = cli.log_level.as_deref().unwrap_or_else(|| default_log_level());
    init_logging(level, cli.log_dir.as_deref())?;

    let conn = open_db(&cli.db_path).map_err(|err| {
        error!(
            "event=startup module=cli status=error error_code=db_init_failed error={err}"
        );
        format!(
            "failed to initialize database `{}`: {err}",
            cli.db_path.display()
        )
    })?;
    info!(
        "event=startup module=cli status=ok db_path={}",
        cli.db_path.display()
    );

    let server = McpServer::new(conn).map_err(|err| {
        error!("event=startup module=cli status=error error_code=schema_check_failed error={err}");
        format!("database `{}` is not usable: {err}", cli.db_path.display())
    })?;
    server
        .run_stdio()
        .map_err(|err| format!("stdio transport failed: {err}"))
}
