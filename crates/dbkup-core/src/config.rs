//! Configuration management for dbkup
//!
//! Loads configuration with priority:
//! 1. The given config file, or `dbkup.toml` found in the current directory or a parent
//! 2. Environment variables (fallback for anything the file leaves unset)
//! 3. Defaults

use crate::dialect::SqlDialect;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "dbkup.toml";

/// dbkup configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbkupConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_driver")]
    pub driver: SqlDialect,

    /// Full connection URL; when set it wins over the individual fields.
    /// Can reference an env var with ${VAR_NAME}
    pub url: Option<String>,

    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Where dumps are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,

    /// Label used when a request leaves it blank
    #[serde(default = "default_label")]
    pub default_label: String,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Emit logs as JSON lines instead of human readable text
    #[serde(default)]
    pub json_logs: bool,

    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub log_filter: Option<String>,

    pub service_name: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            url: None,
            host: None,
            port: None,
            username: None,
            password: None,
            name: None,
            max_connections: default_max_connections(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            default_label: default_label(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl DatabaseConfig {
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(match self.driver {
            SqlDialect::MySql => 3306,
            SqlDialect::Sqlite => 0,
        })
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DbkupConfig {
    /// Load configuration, falling back to environment-only settings when no
    /// config file exists.
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No {} found, using environment configuration", CONFIG_FILE_NAME);
                Ok(Self::from_env())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from: {:?}", path);

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: DbkupConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.resolve_env_vars();
        config.apply_env_fallbacks();

        Ok(config)
    }

    /// Defaults plus whatever the environment provides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_fallbacks();
        config
    }

    /// Find dbkup.toml by searching current directory and parents
    fn find_config_file() -> Option<PathBuf> {
        let mut current = env::current_dir().ok()?;

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve ${VAR_NAME} references to environment variables
    fn resolve_env_vars(&mut self) {
        let db = &mut self.database;
        for field in [
            &mut db.url,
            &mut db.host,
            &mut db.username,
            &mut db.password,
            &mut db.name,
        ] {
            if let Some(value) = field.take() {
                *field = Self::resolve_env_var(&value);
            }
        }
    }

    /// Fill unset database fields from the deployment environment
    fn apply_env_fallbacks(&mut self) {
        let db = &mut self.database;
        if db.url.is_none() {
            db.url = env::var("DATABASE_URL").ok();
        }
        if db.host.is_none() {
            db.host = env::var("DB_SERVER").ok();
        }
        if db.port.is_none() {
            db.port = env::var("DB_PORT").ok().and_then(|p| p.trim().parse().ok());
        }
        if db.username.is_none() {
            db.username = env::var("DB_USERNAME").ok();
        }
        if db.password.is_none() {
            db.password = env::var("DB_PASSWORD").ok();
        }
        if db.name.is_none() {
            db.name = env::var("DB_NAME").ok();
        }
        if let Ok(dir) = env::var("DBKUP_BACKUP_DIR") {
            self.backup.dir = PathBuf::from(dir);
        }
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }
}

fn default_driver() -> SqlDialect {
    SqlDialect::MySql
}

fn default_max_connections() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("bkups")
}

fn default_label() -> String {
    "bkup-database".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}
