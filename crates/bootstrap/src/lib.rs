//! Smoke test for a MySQL primary/replica pair.
//!
//! A run opens a writer and a reader connection, creates the `test` table when
//! it is missing, seeds it with one row, and prints the first row read back
//! through the reader.
//!
//! ```rust,ignore
//! let config = BootstrapConfig::from_env()?;
//! let connector = MySqlConnector::new(&config);
//! let report = run(&config, &connector, &mut std::io::stdout()).await?;
//! ```

pub mod bootstrap;
pub mod config;
pub mod database;
pub mod errors;
pub mod schema;

pub use bootstrap::{NO_DATA, RunReport, run};
pub use config::{BootstrapConfig, Credentials, ProvisionMode};
pub use database::{Connector, Endpoint, MySqlConnector, MySqlEndpoint, Role};
pub use errors::{BootstrapError, ConfigError, ProvisionError, driver_message};
