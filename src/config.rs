//! Configuration loading and validation.
//!
//! The migration run is described by a TOML file:
//!
//! ```toml
//! databases = [0, 1]
//! workers = 4
//! clear_destination = true
//!
//! [source]
//! host = "old-redis.internal"
//! port = 6379
//! password = "hunter2"
//!
//! [destination]
//! host = "new-redis.internal"
//! port = 6379
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file `{path}`")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file `{path}`")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("no databases configured for migration")]
    NoDatabases,
    #[error("database {0} is listed more than once")]
    DuplicateDatabase(u32),
}

/// One Redis endpoint. The password is omitted from `Debug` output so
/// configurations can be logged.
#[derive(Clone, PartialEq, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
}

impl Endpoint {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Configuration {
    pub source: Endpoint,
    pub destination: Endpoint,
    /// Database indices to migrate, in order.
    pub databases: Vec<u32>,
    /// Concurrency ceiling; clamped, never rejected.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Wipe each destination database before copying into it.
    #[serde(default)]
    pub clear_destination: bool,
    /// Pattern fed to KEYS when enumerating the source.
    #[serde(default = "default_key_pattern")]
    pub key_pattern: String,
}

fn default_workers() -> usize {
    1
}

fn default_key_pattern() -> String {
    "*".to_string()
}

impl Configuration {
    /// Reads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let configuration: Configuration =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.databases.is_empty() {
            return Err(ConfigError::NoDatabases);
        }

        let mut seen = std::collections::HashSet::new();
        for &database in &self.databases {
            if !seen.insert(database) {
                return Err(ConfigError::DuplicateDatabase(database));
            }
        }

        Ok(())
    }
}
