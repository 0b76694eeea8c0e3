//! The bootstrap run: connect, provision, seed, read back, close.
//!
//! Only a failed writer connection ends the run early. Every other failure is
//! turned into an output line or a `warn` event and the run carries on.

use std::io::Write;

use tracing::{error, info, warn};

use crate::config::{BootstrapConfig, ProvisionMode};
use crate::database::{Connector, Endpoint, Role};
use crate::errors::{BootstrapError, ProvisionError, driver_message};
use crate::schema::{NAME_COLUMN, TABLE_NAME, provision_lock_name};

pub const NO_DATA: &str = "No data found.";

/// What a completed run did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub table_created: bool,
    pub seed_inserted: bool,
    pub creation_error: Option<String>,
    /// `None` when no row was returned or the read failed.
    pub first_value: Option<String>,
}

/// Runs the bootstrap against the endpoints in `config`, writing the
/// human-readable result to `out`.
///
/// Connections that were opened are closed before returning, on every path.
pub async fn run<C, W>(
    config: &BootstrapConfig,
    connector: &C,
    out: &mut W,
) -> Result<RunReport, BootstrapError>
where
    C: Connector,
    W: Write,
{
    info!(
        writer = %config.writer_host,
        reader = %config.reader_host,
        database = %config.database,
        mode = %config.provision_mode,
        "Connecting to database endpoints"
    );

    let writer = connector.connect(Role::Writer, &config.writer_host).await;
    let reader = connector.connect(Role::Reader, &config.reader_host).await;

    let mut writer = match writer {
        Ok(conn) => conn,
        Err(e) => {
            if let Ok(reader) = reader {
                close_quietly(Role::Reader, reader).await;
            }
            let message = driver_message(&e);
            error!(host = %config.writer_host, "Writer connection failed: {message}");

            let err = BootstrapError::WriterConnection(message);
            write!(out, "{err}")?;
            out.flush()?;
            return Err(err);
        }
    };

    let mut reader = match reader {
        Ok(conn) => Some(conn),
        Err(e) => {
            warn!(
                host = %config.reader_host,
                "Reader connection failed, continuing without it: {}",
                driver_message(&e)
            );
            None
        }
    };

    let result = provision_and_read(config, &mut writer, reader.as_mut(), out).await;

    close_quietly(Role::Writer, writer).await;
    if let Some(reader) = reader {
        close_quietly(Role::Reader, reader).await;
    }

    let report = result?;
    info!(
        created = report.table_created,
        seeded = report.seed_inserted,
        found = report.first_value.is_some(),
        "Bootstrap finished"
    );
    Ok(report)
}

async fn provision_and_read<E, W>(
    config: &BootstrapConfig,
    writer: &mut E,
    mut reader: Option<&mut E>,
    out: &mut W,
) -> Result<RunReport, BootstrapError>
where
    E: Endpoint,
    W: Write,
{
    let mut report = RunReport::default();

    match config.provision_mode {
        ProvisionMode::CheckThenCreate => {
            // Check and create run on different connections with nothing
            // scoping them together; concurrent runs may both create.
            let exists = match reader.as_deref_mut() {
                Some(reader) => check_table(Role::Reader, reader).await,
                None => None,
            };
            if exists == Some(false) {
                create_and_seed(writer, out, &mut report).await?;
            }
        }
        ProvisionMode::Locked => {
            provision_locked(config, writer, out, &mut report).await?;
        }
    }

    report.first_value = match reader {
        Some(reader) => match reader.fetch_first_value(NAME_COLUMN).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Reading from '{TABLE_NAME}' failed: {}", driver_message(&e));
                None
            }
        },
        None => None,
    };

    match &report.first_value {
        Some(value) => write!(out, "{value}")?,
        None => write!(out, "{NO_DATA}")?,
    }
    out.flush()?;

    Ok(report)
}

/// `None` when the lookup itself failed and existence is unknown.
async fn check_table<E: Endpoint>(role: Role, conn: &mut E) -> Option<bool> {
    match conn.table_exists(TABLE_NAME).await {
        Ok(exists) => Some(exists),
        Err(e) => {
            warn!(%role, "Table check failed, skipping creation: {}", driver_message(&e));
            None
        }
    }
}

async fn create_and_seed<E, W>(
    writer: &mut E,
    out: &mut W,
    report: &mut RunReport,
) -> Result<(), BootstrapError>
where
    E: Endpoint,
    W: Write,
{
    match writer.create_table().await {
        Ok(()) => {
            info!("Created table '{TABLE_NAME}'");
            write!(out, "Table '{TABLE_NAME}' created successfully.<br>")?;
            report.table_created = true;

            // The insert outcome never reaches the output; failures are only logged.
            match writer.insert_seed().await {
                Ok(_) => report.seed_inserted = true,
                Err(e) => warn!("Seed insert failed, ignoring: {}", driver_message(&e)),
            }
        }
        Err(e) => report_creation_error(ProvisionError::from(e), out, report)?,
    }

    Ok(())
}

async fn provision_locked<E, W>(
    config: &BootstrapConfig,
    writer: &mut E,
    out: &mut W,
    report: &mut RunReport,
) -> Result<(), BootstrapError>
where
    E: Endpoint,
    W: Write,
{
    let lock = provision_lock_name(&config.database, TABLE_NAME);

    match writer.acquire_lock(&lock, config.lock_timeout_secs).await {
        Ok(true) => {}
        Ok(false) => {
            let err = ProvisionError::LockTimeout {
                name: lock,
                timeout_secs: config.lock_timeout_secs,
            };
            return report_creation_error(err, out, report);
        }
        Err(e) => return report_creation_error(ProvisionError::from(e), out, report),
    }

    // Checked on the writer so replica lag cannot hide a table another run
    // just created.
    let result = match check_table(Role::Writer, writer).await {
        Some(false) => create_and_seed(writer, out, report).await,
        Some(true) | None => Ok(()),
    };

    if let Err(e) = writer.release_lock(&lock).await {
        warn!(lock = %lock, "Releasing provisioning lock failed: {}", driver_message(&e));
    }

    result
}

fn report_creation_error<W: Write>(
    err: ProvisionError,
    out: &mut W,
    report: &mut RunReport,
) -> Result<(), BootstrapError> {
    warn!("Creating table '{TABLE_NAME}' failed: {err}");
    write!(out, "Error creating table: {err}")?;
    report.creation_error = Some(err.to_string());
    Ok(())
}

async fn close_quietly<E: Endpoint>(role: Role, conn: E) {
    if let Err(e) = conn.close().await {
        warn!(%role, "Closing connection failed: {}", driver_message(&e));
    }
}
