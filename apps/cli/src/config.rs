//! # Configuration
//!
//! Application configuration loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Command-line flags (`--db`)
//! 2. Environment variables (`DIGICAL_*`)
//! 3. Defaults (this file)
//!
//! | Variable                  | Default                        |
//! |---------------------------|--------------------------------|
//! | `DIGICAL_DB_PATH`         | `<data dir>/digical.db`        |
//! | `DIGICAL_CURRENCY_SYMBOL` | `₹`                            |
//! | `DIGICAL_HISTORY_LIMIT`   | `100`                          |
//! | `DIGICAL_STORE_NAME`      | `DigiCal Business Calculator`  |
//!
//! Configuration is read-only after startup.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Serialize;
use thiserror::Error;

use digical_core::{Money, DEFAULT_HISTORY_LIMIT};

pub const DB_PATH_VAR: &str = "DIGICAL_DB_PATH";
pub const CURRENCY_SYMBOL_VAR: &str = "DIGICAL_CURRENCY_SYMBOL";
pub const HISTORY_LIMIT_VAR: &str = "DIGICAL_HISTORY_LIMIT";
pub const STORE_NAME_VAR: &str = "DIGICAL_STORE_NAME";

const DEFAULT_CURRENCY_SYMBOL: &str = "₹";
const DEFAULT_STORE_NAME: &str = "DigiCal Business Calculator";
const DATABASE_FILE: &str = "digical.db";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Could not determine the application data directory")]
    NoDataDirectory,

    #[error("Could not create data directory {path}: {source}")]
    DataDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Prefix for formatted amounts.
    pub currency_symbol: String,

    /// Default row limit for history listings.
    pub history_limit: u32,

    /// Shown in the `summary` header.
    pub store_name: String,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// `db_override` comes from the `--db` flag and beats everything else.
    pub fn from_env(db_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), db_override)
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F, db_override: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_path = match db_override.or_else(|| non_empty(DB_PATH_VAR).map(PathBuf::from)) {
            Some(path) => path,
            None => default_database_path()?,
        };

        let history_limit = match non_empty(HISTORY_LIMIT_VAR) {
            Some(raw) => parse_limit(&raw)?,
            None => DEFAULT_HISTORY_LIMIT,
        };

        Ok(AppConfig {
            database_path,
            currency_symbol: non_empty(CURRENCY_SYMBOL_VAR).unwrap_or_else(|| DEFAULT_CURRENCY_SYMBOL.to_string()),
            history_limit,
            store_name: non_empty(STORE_NAME_VAR).unwrap_or_else(|| DEFAULT_STORE_NAME.to_string()),
        })
    }

    /// Renders an amount with the currency symbol, sign first.
    ///
    /// ## Example
    /// ```rust,ignore
    /// assert_eq!(config.format_currency(Money::from_major(500)), "₹500.00");
    /// assert_eq!(config.format_currency(Money::from_cents(-550)), "-₹5.50");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        if amount.is_negative() {
            format!("-{}{}", self.currency_symbol, amount.abs())
        } else {
            format!("{}{}", self.currency_symbol, amount)
        }
    }

    /// Creates the directory holding the database file if needed.
    pub fn ensure_data_dir(&self) -> Result<(), ConfigError> {
        match self.database_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                std::fs::create_dir_all(dir).map_err(|source| ConfigError::DataDirectory {
                    path: dir.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Platform-specific default location.
///
/// - **Linux**: `~/.local/share/digical/digical.db`
/// - **macOS**: `~/Library/Application Support/com.digical.digical/digical.db`
/// - **Windows**: `%APPDATA%\digical\digical\data\digical.db`
fn default_database_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("com", "digical", "digical").ok_or(ConfigError::NoDataDirectory)?;
    Ok(dirs.data_dir().join(DATABASE_FILE))
}

fn parse_limit(raw: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: HISTORY_LIMIT_VAR.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    match raw.trim().parse::<u32>() {
        Ok(0) => Err(invalid("must be at least 1")),
        Ok(limit) => Ok(limit),
        Err(_) => Err(invalid("expected a whole number")),
    }
}
