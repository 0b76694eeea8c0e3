//! Configuration for a bootstrap run, read once from the environment.

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_LOCK_TIMEOUT_SECS: u32 = 10;

/// How the existence check and the create+seed step are performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvisionMode {
    /// Check on the reader, create and seed on the writer. Two concurrent runs
    /// against an empty database can both see the table as absent.
    #[default]
    CheckThenCreate,
    /// Hold a named advisory lock on the writer around check, create and seed.
    Locked,
}

impl ProvisionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionMode::CheckThenCreate => "check-then-create",
            ProvisionMode::Locked => "locked",
        }
    }
}

impl FromStr for ProvisionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "check-then-create" => Ok(ProvisionMode::CheckThenCreate),
            "locked" => Ok(ProvisionMode::Locked),
            _ => Err(ConfigError::InvalidProvisionMode(s.to_string())),
        }
    }
}

impl fmt::Display for ProvisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials shared by the writer and reader connections.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Primary endpoint, used for schema and data mutation (`DB_HOST`).
    pub writer_host: String,

    /// Replica endpoint, used for queries (`DB_READER_HOST`).
    pub reader_host: String,

    /// TCP port of both endpoints (`DB_PORT`).
    pub port: u16,

    /// `DB_USER` / `DB_PASS`.
    pub credentials: Credentials,

    /// Target database on both endpoints (`DB_NAME`).
    pub database: String,

    /// `DB_PROVISION_MODE`.
    pub provision_mode: ProvisionMode,

    /// Seconds to wait for the advisory lock in [`ProvisionMode::Locked`]
    /// (`DB_LOCK_TIMEOUT_SECS`).
    pub lock_timeout_secs: u32,
}

impl BootstrapConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// The five connection settings are required but not validated: an unset
    /// variable reads as the empty string and surfaces later as a connection
    /// failure.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name).unwrap_or_else(|| {
                tracing::warn!(variable = name, "Environment variable not set, using empty value");
                String::new()
            })
        };

        let port = match lookup("DB_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let provision_mode = match lookup("DB_PROVISION_MODE") {
            Some(raw) => raw.parse()?,
            None => ProvisionMode::default(),
        };

        let lock_timeout_secs = match lookup("DB_LOCK_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidLockTimeout(raw))?,
            None => DEFAULT_LOCK_TIMEOUT_SECS,
        };

        Ok(Self {
            writer_host: required("DB_HOST"),
            reader_host: required("DB_READER_HOST"),
            port,
            credentials: Credentials {
                username: required("DB_USER"),
                password: required("DB_PASS"),
            },
            database: required("DB_NAME"),
            provision_mode,
            lock_timeout_secs,
        })
    }
}
