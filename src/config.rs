//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;
use std::path::PathBuf;

/// Page size used when a list request carries no `limit`
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Storage configuration
    pub storage: StorageConfig,
    /// API limits
    pub api: ApiConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base directory for the database and the block store
    pub data_dir: PathBuf,
    /// SQLite database file
    pub database_path: PathBuf,
}

/// Request limits enforced by the HTTP layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiConfig {
    /// Largest `limit` a list request may ask for
    pub max_limit: u32,
    /// Largest accepted upload payload, in bytes
    pub max_upload_bytes: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_limit: 1000,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl StorageConfig {
    /// Directory holding content-addressed blobs
    pub fn blocks_dir(&self) -> PathBuf {
        self.data_dir.join("blocks")
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let data_dir = env::var("DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| {
            // Default to ~/.inbox-api or current directory
            if let Some(home) = env::var_os("HOME") {
                PathBuf::from(home).join(".inbox-api")
            } else {
                PathBuf::from(".inbox-api")
            }
        });
        let database_path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("inbox.db"));

        let defaults = ApiConfig::default();
        let max_limit = env::var("API_MAX_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_limit)
            .max(DEFAULT_PAGE_LIMIT);

        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8888),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            storage: StorageConfig {
                data_dir,
                database_path,
            },
            api: ApiConfig {
                max_limit,
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.max_upload_bytes),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
