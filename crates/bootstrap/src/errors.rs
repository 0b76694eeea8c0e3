use thiserror::Error;

/// Invalid optional settings. Carries the value exactly as it was set.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("DB_PORT must be a TCP port number, got '{0}'")]
    InvalidPort(String),

    #[error("DB_PROVISION_MODE must be 'check-then-create' or 'locked', got '{0}'")]
    InvalidProvisionMode(String),

    #[error("DB_LOCK_TIMEOUT_SECS must be a whole number of seconds, got '{0}'")]
    InvalidLockTimeout(String),
}

/// Errors that end a bootstrap run early.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// The only fatal database failure. Displays as the exact line printed
    /// before the process exits.
    #[error("Connection failed: {0}")]
    WriterConnection(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl BootstrapError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            BootstrapError::WriterConnection(_) | BootstrapError::Output(_) => 1,
            BootstrapError::Config(_) => 2,
        }
    }
}

/// Non-fatal failures while provisioning the table.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("{}", driver_message(.0))]
    Database(#[from] sqlx::Error),

    #[error("timed out after {timeout_secs}s waiting for lock '{name}'")]
    LockTimeout { name: String, timeout_secs: u32 },
}

/// Renders a driver error the way an operator reads it.
///
/// Errors returned by the server carry only the server message
/// (`Table 'test' already exists`); everything else uses the driver's text.
pub fn driver_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}
