//! Runtime profile: which database to open, and how to migrate it.

use crate::error::{CoreError, CoreResult};
use crate::version::{Version, APP_VERSION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// DSN that selects a private in-memory database.
pub const MEMORY_DSN: &str = ":memory:";

/// Profile loaded from `strata.yml` (or built in code).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Run mode; anything other than `prod` rebuilds the schema from scratch
    #[serde(default)]
    pub mode: Mode,

    /// Storage engine adapter
    #[serde(default)]
    pub driver: Driver,

    /// Database file path, or `:memory:`
    pub dsn: String,

    /// Application version the schema must be brought up to
    #[serde(default = "default_version")]
    pub version: String,

    /// Lock wait timeout handed to the storage engine, in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Run mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Production: versioned, history-tracked migrations (default)
    #[default]
    Prod,
    /// Development: disposable database rebuilt from the dev schema
    Dev,
    /// Development plus sample data
    Demo,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Prod => write!(f, "prod"),
            Mode::Dev => write!(f, "dev"),
            Mode::Demo => write!(f, "demo"),
        }
    }
}

/// Storage engine selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// DuckDB
    DuckDb,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Driver::Sqlite => write!(f, "sqlite"),
            Driver::DuckDb => write!(f, "duckdb"),
        }
    }
}

fn default_version() -> String {
    APP_VERSION.to_string()
}

fn default_busy_timeout_ms() -> u64 {
    10_000
}

impl Profile {
    /// Build a profile in code with default version and timeout.
    pub fn new(mode: Mode, driver: Driver, dsn: impl Into<String>) -> Self {
        Self {
            mode,
            driver,
            dsn: dsn.into(),
            version: default_version(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    /// Override the application version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Load and validate a profile from a YAML file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ProfileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let profile = Self::from_yaml_str(&content)?;
        log::debug!(
            "Loaded {} profile for {} from {}",
            profile.mode,
            profile.driver,
            path.display()
        );
        Ok(profile)
    }

    /// Parse and validate a profile from YAML text.
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        let profile: Profile = serde_yaml::from_str(content)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Validate the profile
    pub fn validate(&self) -> CoreResult<()> {
        if self.dsn.trim().is_empty() {
            return Err(CoreError::ProfileInvalid {
                message: "dsn required".to_string(),
            });
        }
        if self.busy_timeout_ms == 0 {
            return Err(CoreError::ProfileInvalid {
                message: "busy_timeout_ms must be greater than zero".to_string(),
            });
        }
        Version::parse(&self.version)?;
        Ok(())
    }

    /// True for `dev` and `demo`.
    pub fn is_dev(&self) -> bool {
        self.mode != Mode::Prod
    }

    pub fn is_demo(&self) -> bool {
        self.mode == Mode::Demo
    }

    pub fn is_memory(&self) -> bool {
        self.dsn == MEMORY_DSN
    }

    /// The application version the database must be migrated to.
    pub fn current_version(&self) -> CoreResult<Version> {
        Version::parse(&self.version)
    }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
