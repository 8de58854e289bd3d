//! Application configuration loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;

/// Which persistence backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Postgres via sqlx.
    Postgres,
    /// Process-local map; records are lost on restart.
    Memory,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Relational Store ===
    /// Postgres host.
    #[serde(default = "default_db_host")]
    pub db_host: String,

    /// Postgres port.
    #[serde(default = "default_db_port")]
    pub db_port: u16,

    /// Database name.
    #[serde(default = "default_db_name")]
    pub db_name: String,

    /// Database user.
    #[serde(default = "default_db_user")]
    pub db_user: String,

    /// Database password.
    #[serde(default)]
    pub db_password: Option<String>,

    /// Schema holding the `tracked_urls` table.
    #[serde(default = "default_db_schema")]
    pub db_schema: String,

    /// Connection pool size.
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    /// Persistence backend.
    #[serde(default = "default_storage")]
    pub storage: StorageBackend,

    // === Token Validation ===
    /// External endpoint consulted for every bearer token.
    #[serde(default)]
    pub token_validation_url: Option<String>,

    /// Outbound validation timeout in seconds.
    #[serde(default = "default_validation_timeout")]
    pub token_validation_timeout_secs: u64,

    // === Server Configuration ===
    /// HTTP listening port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_name() -> String {
    "postgres".to_string()
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_db_schema() -> String {
    "public".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_storage() -> StorageBackend {
    StorageBackend::Postgres
}

fn default_validation_timeout() -> u64 {
    5
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_host: default_db_host(),
            db_port: default_db_port(),
            db_name: default_db_name(),
            db_user: default_db_user(),
            db_password: None,
            db_schema: default_db_schema(),
            db_max_connections: default_max_connections(),
            storage: default_storage(),
            token_validation_url: None,
            token_validation_timeout_secs: default_validation_timeout(),
            port: default_port(),
            rust_log: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        let validation_url = match self.token_validation_url.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => u,
            _ => return Err("TOKEN_VALIDATION_URL is required".to_string()),
        };

        match url::Url::parse(validation_url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            Ok(u) => {
                return Err(format!(
                    "TOKEN_VALIDATION_URL must use http or https, got {}",
                    u.scheme()
                ))
            }
            Err(e) => return Err(format!("TOKEN_VALIDATION_URL is not a valid URL: {}", e)),
        }

        if !is_sql_identifier(&self.db_schema) {
            return Err(format!(
                "DB_SCHEMA must be a plain identifier (letters, digits, underscore), got {:?}",
                self.db_schema
            ));
        }

        if self.token_validation_timeout_secs == 0 {
            return Err("TOKEN_VALIDATION_TIMEOUT_SECS must be greater than 0".to_string());
        }

        if self.db_max_connections == 0 {
            return Err("DB_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Log filter for startup, resolved before the full config is loaded.
    ///
    /// Reads `.env` first so a `RUST_LOG` there applies. Falls back to the
    /// `rust_log` default when unset or blank.
    pub fn log_filter_from_env() -> String {
        dotenvy::dotenv().ok();
        resolve_log_filter(std::env::var("RUST_LOG").ok())
    }

    /// Outbound validation timeout.
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.token_validation_timeout_secs)
    }
}

fn resolve_log_filter(raw: Option<String>) -> String {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default_log_level)
}

/// True if `name` can be spliced into DDL without quoting surprises.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
