//! Connection and dump/restore options

use crate::{MydumpError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default `max_allowed_packet` used to bound extended inserts (4 MiB)
pub const DEFAULT_MAX_ALLOWED_PACKET: usize = 4 * 1024 * 1024;

/// Default MySQL port
pub const DEFAULT_PORT: u16 = 3306;

/// Upper bound for `parallelism`; each worker holds its own server connection
pub const MAX_PARALLELISM: usize = 1024;

/// Where and how to connect. Built fresh for every dump or restore call.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            user: user.into(),
            password: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Options for dump operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DumpOptions {
    /// Strip comments, charset bookkeeping, lock/key wrappers and the footer
    pub compact: bool,
    /// Omit the `CREATE DATABASE` / `USE` preamble
    pub suppress_use_database: bool,
    /// Emit one `INSERT` statement per row
    pub skip_extended_insert: bool,
    /// Keep `STORED GENERATED` columns in the dumped column list
    pub include_generated_columns: bool,
    /// Upper bound in bytes for a single extended `INSERT`
    pub max_allowed_packet: usize,
    /// Number of dump targets processed concurrently
    pub parallelism: usize,
    /// Hold `LOCK TABLES ... READ` on every table while dumping a schema
    pub lock_tables: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            compact: false,
            suppress_use_database: false,
            skip_extended_insert: false,
            include_generated_columns: false,
            max_allowed_packet: DEFAULT_MAX_ALLOWED_PACKET,
            parallelism: 1,
            lock_tables: false,
        }
    }
}

impl DumpOptions {
    pub fn compact() -> Self {
        Self {
            compact: true,
            ..Default::default()
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_max_allowed_packet(mut self, bytes: usize) -> Self {
        self.max_allowed_packet = bytes;
        self
    }

    pub fn with_skip_extended_insert(mut self, skip: bool) -> Self {
        self.skip_extended_insert = skip;
        self
    }

    pub fn with_lock_tables(mut self, lock: bool) -> Self {
        self.lock_tables = lock;
        self
    }

    /// Parse options from a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let options: Self = toml::from_str(source)
            .map_err(|e| MydumpError::Configuration(format!("invalid dump options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Reject values that would make a dump impossible before any I/O happens
    pub fn validate(&self) -> Result<()> {
        if self.max_allowed_packet == 0 {
            return Err(MydumpError::Configuration(
                "max-allowed-packet must be greater than zero".into(),
            ));
        }
        if self.parallelism == 0 {
            return Err(MydumpError::Configuration(
                "parallelism must be at least 1".into(),
            ));
        }
        if self.parallelism > MAX_PARALLELISM {
            return Err(MydumpError::Configuration(format!(
                "parallelism must be at most {}, got {}",
                MAX_PARALLELISM, self.parallelism
            )));
        }
        Ok(())
    }
}

/// Options for restore operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RestoreOptions {
    /// Source database name -> destination database name
    pub database_mapping: HashMap<String, String>,
}

impl RestoreOptions {
    pub fn with_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.database_mapping.insert(from.into(), to.into());
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source)
            .map_err(|e| MydumpError::Configuration(format!("invalid restore options: {}", e)))
    }
}
