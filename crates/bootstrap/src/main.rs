use std::io;
use std::process::ExitCode;

use replica_bootstrap::{BootstrapConfig, BootstrapError, MySqlConnector, run};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Logs go to stderr; stdout carries only the bootstrap result.
fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn exit_code(err: &BootstrapError) -> ExitCode {
    ExitCode::from(err.exit_code())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    init_logging();

    let config = match BootstrapConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let err = BootstrapError::from(e);
            tracing::error!("{err}");
            return Ok(exit_code(&err));
        }
    };

    let connector = MySqlConnector::new(&config);
    let mut stdout = io::stdout().lock();

    match run(&config, &connector, &mut stdout).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        // Already written to stdout by the run.
        Err(err @ BootstrapError::WriterConnection(_)) => Ok(exit_code(&err)),
        Err(err) => Err(err.into()),
    }
}
