//! Server configuration: a RON file plus a few environment overrides.
//!
//! ```ron
//! (
//!     bind_addr: "0.0.0.0:8787",
//!     fetch: (
//!         request_timeout_secs: 15,
//!         max_bytes: 2097152,
//!         allowed_content_types: ["text/html"],
//!     ),
//!     trusted_hosts: ["intranet.example.com"],
//!     log_destination: Both,
//!     log_level: "debug",
//! )
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use glance_engine::{default_content_types, FetchSettings, GuardSettings, DEFAULT_USER_AGENT};
use glance_logging::{LevelFilter, LogDestination};
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "GLANCE_CONFIG";
pub const BIND_ENV: &str = "GLANCE_BIND";
pub const LOG_ENV: &str = "GLANCE_LOG";
pub const DEFAULT_CONFIG_FILE: &str = "./glance.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("invalid bind address {0:?}")]
    InvalidBindAddr(String),
    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_bytes: u64,
    pub redirect_limit: usize,
    pub user_agent: String,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_bytes: 5 * 1024 * 1024,
            redirect_limit: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allowed_content_types: default_content_types(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub fetch: FetchConfig,
    /// Hosts exempt from the private-address check (e.g. an internal mirror).
    pub trusted_hosts: Vec<String>,
    pub log_destination: LogDestination,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8787".to_string(),
            fetch: FetchConfig::default(),
            trusted_hosts: Vec::new(),
            log_destination: LogDestination::Terminal,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using `env` as the environment. The file named by `GLANCE_CONFIG`
    /// must exist; the default file is optional.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match env(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => match Self::from_file(Path::new(DEFAULT_CONFIG_FILE)) {
                Err(ConfigError::Read { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    Self::default()
                }
                other => other?,
            },
        };

        if let Some(bind) = env(BIND_ENV) {
            config.bind_addr = bind;
        }
        if let Some(level) = env(LOG_ENV) {
            config.log_level = level;
        }

        config.socket_addr()?;
        config.level_filter()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(self.bind_addr.clone()))
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(self.log_level.trim())
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.fetch.request_timeout_secs),
            redirect_limit: self.fetch.redirect_limit,
            max_bytes: self.fetch.max_bytes,
            user_agent: self.fetch.user_agent.clone(),
            allowed_content_types: self.fetch.allowed_content_types.clone(),
        }
    }

    pub fn guard_settings(&self) -> GuardSettings {
        GuardSettings {
            trusted_hosts: self.trusted_hosts.clone(),
        }
    }
}
