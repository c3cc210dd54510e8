//! # Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `relboard.toml` (or the file named by `--config`)
//! 3. `RELBOARD_*` environment variables
//! 4. CLI flags (applied by the `cli` module)
//!
//! ## File Format
//!
//! ```toml
//! seed_on_start = true
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! cors_origins = ["http://localhost:3000"]
//! rate_limit = 100
//! api_key = "secret"
//! body_limit_bytes = 2097152
//!
//! [storage]
//! backend = "redb"
//! path = "relboard.redb"
//! max_write_retries = 5
//! ```

use relboard_core::primitives::DEFAULT_MAX_WRITE_RETRIES;
use relboard_core::{MemoryStore, RecordStore, RedbStore, RelboardError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "relboard.toml";

/// Default request body cap: 2 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Default rate limit in requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Errors raised while assembling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value '{value}' for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Where records live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Process-local, lost on exit.
    Memory,
    /// redb file on disk.
    #[default]
    Redb,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redb" => Ok(Self::Redb),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Redb => "redb",
        })
    }
}

// =============================================================================
// SECTIONS
// =============================================================================

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` allows localhost only; `["*"]` allows every origin.
    pub cors_origins: Option<Vec<String>>,
    /// Requests per second; 0 disables limiting.
    pub rate_limit: u32,
    /// When set, every route except `/health` needs `Authorization: Bearer <key>`.
    pub api_key: Option<String>,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            api_key: None,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The API key, ignoring an empty string.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: Backend,
    pub path: PathBuf,
    pub max_write_retries: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Redb,
            path: PathBuf::from("relboard.redb"),
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
        }
    }
}

impl StorageConfig {
    /// Open the configured record store.
    pub fn open_store(&self) -> Result<Arc<dyn RecordStore>, RelboardError> {
        match self.backend {
            Backend::Memory => Ok(Arc::new(MemoryStore::new())),
            Backend::Redb => Ok(Arc::new(RedbStore::open(&self.path)?)),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Write the seed catalog into an empty store at startup.
    pub seed_on_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            seed_on_start: true,
        }
    }
}

impl Config {
    /// Defaults, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist. Without one, `relboard.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.with_env_from(|var| std::env::var(var).ok())
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Parse TOML text; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `RELBOARD_*` overrides read through `lookup`.
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("RELBOARD_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env(&lookup, "RELBOARD_PORT")? {
            self.server.port = port;
        }
        if let Some(origins) = lookup("RELBOARD_CORS_ORIGINS") {
            self.server.cors_origins = Some(
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        if let Some(rate) = parse_env(&lookup, "RELBOARD_RATE_LIMIT")? {
            self.server.rate_limit = rate;
        }
        if let Some(key) = lookup("RELBOARD_API_KEY") {
            self.server.api_key = Some(key);
        }
        if let Some(limit) = parse_env(&lookup, "RELBOARD_BODY_LIMIT")? {
            self.server.body_limit_bytes = limit;
        }
        if let Some(backend) = parse_env(&lookup, "RELBOARD_BACKEND")? {
            self.storage.backend = backend;
        }
        if let Some(path) = lookup("RELBOARD_DATABASE") {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(retries) = parse_env(&lookup, "RELBOARD_MAX_WRITE_RETRIES")? {
            self.storage.max_write_retries = retries;
        }
        if let Some(seed) = parse_env(&lookup, "RELBOARD_SEED_ON_START")? {
            self.seed_on_start = seed;
        }
        Ok(self)
    }
}

fn parse_env<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
    }
}

// =============================================================================
// TESTS
// =============================================================================
