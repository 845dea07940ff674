//! Configuration Module
//!
//! Command-line arguments and the startup-time accounts file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::store::Params;

// == Args ==
/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "kvcache", about = "In-memory key/value cache server with TTL")]
pub struct Args {
    /// Path to the YAML accounts file ({login: password})
    #[arg(long, default_value = "./accounts")]
    pub accounts_path: PathBuf,

    /// Period of expired entry removal, e.g. "30s" (floor 100ms)
    #[arg(long, default_value = "60s", value_parser = humantime::parse_duration)]
    pub cleaning_period: Duration,

    /// Period of snapshot dumps, e.g. "2m" (floor 60s)
    #[arg(long, default_value = "60s", value_parser = humantime::parse_duration)]
    pub dumping_period: Duration,

    /// Path of the snapshot dump file
    #[arg(long, default_value = "./dump")]
    pub dump_path: PathBuf,

    /// HTTP listen port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}

impl Args {
    /// The store parameters carried by these arguments. Range validation
    /// happens at store construction.
    pub fn params(&self) -> Params {
        Params {
            cleaning_period: self.cleaning_period,
            dumping_period: self.dumping_period,
        }
    }
}

// == Accounts ==
/// Failures loading the accounts file.
#[derive(Debug, Error)]
pub enum AccountsError {
    #[error("failed to read accounts file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse accounts YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Loads the `{login: password}` accounts mapping. An empty file yields an
/// empty mapping (which rejects every request).
pub fn load_accounts(path: &Path) -> Result<HashMap<String, String>, AccountsError> {
    let raw = std::fs::read_to_string(path).map_err(|source| AccountsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let accounts: Option<HashMap<String, String>> = serde_yaml::from_str(&raw)?;
    Ok(accounts.unwrap_or_default())
}
