//! Server configuration.
//!
//! Read from the `[server]` table of a TOML file. Every key has a default, so
//! an empty file is a valid configuration.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = "8080"
//! swagger = "/docs"
//! context-path = "/api"
//! shutdown-timeout = 30
//! body-limit = 4194304
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_BODY_LIMIT: usize = 4 * 1024 * 1024;

/// Failure to read or parse the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Root configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
}

impl Config {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }
}

/// The `[server]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    pub host: String,

    /// Kept as a string, as written in the file. `"0"` picks a free port.
    pub port: String,

    /// Where API documentation is mounted. Reported at startup; photon does
    /// not serve it itself.
    pub swagger: String,

    /// Prefix applied to every controller path. Empty or `/` for none.
    pub context_path: String,

    /// Seconds to wait for in-flight connections when stopping.
    pub shutdown_timeout: u64,

    /// Largest request body accepted, in bytes. Bigger bodies get `413`.
    pub body_limit: usize,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: "8080".to_owned(),
            swagger: String::new(),
            context_path: String::new(),
            shutdown_timeout: 30,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}
