use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use blockify::config::Config;
use blockify::init::{init_blocklist, setup_logging, spawn_signal_listener};
use blockify::logger::ActionLogger;
use blockify::monitor::PlaybackMonitor;
use blockify::mute::MuteBackend;
use blockify::observer::WmctrlObserver;
use blockify::runner::{CommandRunner, SystemRunner};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or("blockify.toml".to_string());
    let config_exists = std::path::Path::new(&config_path).exists();
    let config = if config_exists {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting blockify...");

    if !config_exists {
        info!("Config file not found, using defaults.");
    }

    let logger = ActionLogger::new(config.logging.clone(), Vec::new());

    // 3. Load the blocklist and merge remote sources
    let store = init_blocklist(&config, logger.clone()).await?;

    // 4. Pick the mute backend
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let backend = MuteBackend::new(
        runner.clone(),
        config.process_name.clone(),
        &config.backend,
        logger.clone(),
    )
    .await;
    info!(
        "Mute backend: {} on channels {:?}",
        backend.kind(),
        backend
            .channels()
            .iter()
            .map(|c| c.name())
            .collect::<Vec<_>>()
    );

    // 5. Build the monitor
    let observer = Arc::new(WmctrlObserver::new(runner));
    let mut monitor = PlaybackMonitor::new(store, backend, observer, &config.player, logger);
    monitor.set_automute(config.automute);

    // 6. Signals become commands for the control loop
    let (command_tx, command_rx) = mpsc::channel(16);
    spawn_signal_listener(command_tx).context("Failed to install signal handlers")?;

    // 7. Run until shutdown
    monitor.start().await;
    info!("Blockify started.");
    monitor.run(command_rx, config.poll_interval()).await;

    Ok(())
}
