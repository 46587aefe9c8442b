use clap::Parser;
use murmur::{init_logging, serve, shutdown_signal, Cli, Settings, ShutdownOutcome};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    cli.apply(&mut settings);

    let logging = init_logging(&settings.logging)?;
    info!(
        listen_address = %settings.listen_address,
        bus = ?settings.bus.backend,
        "Starting murmur"
    );

    let result = serve(&settings, shutdown_signal()).await;
    match &result {
        Ok(ShutdownOutcome::Completed) => info!("Stopped"),
        Ok(ShutdownOutcome::TimedOut) => warn!("Stopped after shutdown timeout"),
        Ok(ShutdownOutcome::Panicked) => warn!("Stopped after a failed drain"),
        Err(e) => error!(error = %e, "Failed to start"),
    }

    logging.shutdown();
    result.map(|_| ()).map_err(Into::into)
}
