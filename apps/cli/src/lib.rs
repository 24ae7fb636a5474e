//! # DigiCal CLI Library
//!
//! Everything behind the `digical` binary: argument parsing, configuration,
//! the command layer and the JSON envelope every invocation prints.
//!
//! ## Module Organization
//! ```text
//! digical_cli/
//! ├── lib.rs          ◄─── You are here (startup & envelope)
//! ├── cli.rs          ◄─── clap argument definitions
//! ├── config.rs       ◄─── Environment-driven configuration
//! ├── error.rs        ◄─── API error type for commands
//! └── commands/
//!     ├── mod.rs      ◄─── Context and dispatch
//!     ├── ledger.rs   ◄─── sale, expense, transactions, calc, history
//!     ├── handler.rs  ◄─── Handlers and incentives
//!     ├── customer.rs ◄─── Customers, dues, settlements
//!     ├── product.rs  ◄─── Stock
//!     └── report.rs   ◄─── Summary, graphs, categories
//! ```
//!
//! ## Output Envelope
//! ```text
//! stdout  {"success": true,  "data": ...}                      exit 0
//!         {"success": false, "error": {"code", "message"}}     exit 1
//! stderr  tracing output (RUST_LOG)
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use commands::{dispatch, Context};
use config::AppConfig;
use digical_db::{Database, DbConfig};
use error::ApiError;

/// What a command prints on stdout.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl From<Result<Value, ApiError>> for Envelope {
    fn from(result: Result<Value, ApiError>) -> Self {
        match result {
            Ok(data) => Envelope {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(error) => Envelope {
                success: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

/// Runs the binary: parse, execute, print the envelope.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize Logging        tracing-subscriber on stderr, RUST_LOG    │
/// │  2. Parse Arguments           clap; usage errors exit before step 3     │
/// │  3. Load Configuration        --db flag > DIGICAL_* env > defaults      │
/// │  4. Connect to Database       SQLite, WAL, pending migrations applied   │
/// │  5. Dispatch Command          one repository call chain                 │
/// │  6. Print Envelope            stdout, exit status from `success`        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let envelope = Envelope::from(execute(cli).await);
    let success = envelope.success;

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => println!("{}", json),
        Err(err) => {
            eprintln!("Could not serialize output: {}", err);
            return ExitCode::FAILURE;
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn execute(cli: Cli) -> Result<Value, ApiError> {
    let config = AppConfig::from_env(cli.db)?;
    config.ensure_data_dir()?;

    debug!(db_path = ?config.database_path, "Configuration loaded");

    let db = Database::new(DbConfig::new(config.database_path.clone())).await?;
    let ctx = Context::new(db, config);

    let result = dispatch(&ctx, cli.command).await;
    ctx.db.close().await;

    if let Err(err) = &result {
        info!(code = ?err.code, "Command failed");
    }
    result
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=digical=trace` - Show trace for digical crates only
/// - Default: warnings, plus INFO from digical crates
///
/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,digical=info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
