//! Process configuration.
//!
//! Everything comes from environment variables with defaults suitable for
//! local development:
//! - `TASKD_HOST` - bind address (default `0.0.0.0`)
//! - `TASKD_PORT` - bind port (default `8000`)
//! - `TASKD_DB` - SQLite database path (default `tasks.db`)

use std::path::PathBuf;

/// Runtime configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the HTTP server
    pub host: String,
    /// Bind port for the HTTP server
    pub port: u16,
    /// Path to the SQLite database file
    pub database_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let host = std::env::var("TASKD_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("TASKD_PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid TASKD_PORT {:?}, falling back to 8000", raw);
                8000
            }),
            Err(_) => 8000,
        };
        let database_path = std::env::var("TASKD_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("tasks.db"));

        Self {
            host,
            port,
            database_path,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_path: PathBuf::from("tasks.db"),
        }
    }
}
