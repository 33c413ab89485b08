//! Initialization helpers for the application startup.

use crate::config::{Config, LoggingConfig};
use crate::engine::{load_sources, BlockStore, HttpFetcher};
use crate::logger::ActionLogger;
use crate::monitor::MonitorCommand;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer<W>(json: bool, ansi: bool, writer: W) -> BoxedLayer
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    if json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_ansi(ansi).with_writer(writer).boxed()
    }
}

/// `env` is the `RUST_LOG` value, which wins over the config when it parses.
fn build_filter(logging: &LoggingConfig, env: Option<&str>) -> EnvFilter {
    if let Some(filter) = env
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
    {
        return filter;
    }

    let mut filter = logging.level.clone();

    // HTTP client internals are noise unless explicitly asked for
    for noisy in ["hyper", "reqwest"] {
        if !filter.contains(noisy) {
            filter.push_str(&format!(",{}=warn", noisy));
        }
    }

    EnvFilter::new(filter)
}

/// Sets up the tracing subscriber: console unless `quiet`, plus an appended
/// log file when `file_path` is set.
pub fn setup_logging(config: &Config) {
    let logging = &config.logging;
    let json = logging.format == "json";
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut file_error = None;

    if !logging.quiet {
        layers.push(fmt_layer(json, true, std::io::stdout));
    }

    if let Some(path) = &logging.file_path {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => layers.push(fmt_layer(json, false, Mutex::new(file))),
            Err(e) => file_error = Some(format!("{}: {}", path.display(), e)),
        }
    }

    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(layers)
        .with(build_filter(logging, env.as_deref()))
        .init();

    if let Some(e) = file_error {
        error!("Could not attach log file {}", e);
    }
}

/// Loads the blocklist and, when enabled, merges the remote sources into it.
///
/// Only an unusable blocklist file is an error; remote trouble is logged.
pub async fn init_blocklist(config: &Config, logger: Arc<ActionLogger>) -> Result<BlockStore> {
    let path = config.blocklist.list_path();
    let mut store = BlockStore::open(&path, logger)
        .with_context(|| format!("Failed to open blocklist {}", path.display()))?;
    info!("Loaded {} blocklist entries from {}", store.len(), path.display());

    if !config.blocklist.load_remotes {
        return Ok(store);
    }

    let sources = match load_sources(config.blocklist.remotes_path()).await {
        Ok(sources) => sources,
        Err(e) => {
            warn!("Ignoring remote sources: {}", e);
            return Ok(store);
        }
    };
    if sources.is_empty() {
        return Ok(store);
    }

    let fetcher = match HttpFetcher::new(Duration::from_secs(config.blocklist.fetch_timeout_secs)) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            warn!("Cannot fetch remote lists: {}", e);
            return Ok(store);
        }
    };

    let added = store
        .merge_remote(&sources, &fetcher, config.blocklist.concurrent_downloads)
        .await
        .context("Failed to save merged blocklist")?;
    info!("Remote merge added {} entries", added);
    Ok(store)
}

/// Forwards process signals to the control loop as commands:
/// SIGUSR1 blocks and SIGUSR2 unblocks the current track, SIGHUP toggles
/// automute, SIGTERM and SIGINT shut down.
#[cfg(unix)]
pub fn spawn_signal_listener(tx: mpsc::Sender<MonitorCommand>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut usr1 = signal(SignalKind::user_defined1())?;
    let mut usr2 = signal(SignalKind::user_defined2())?;
    let mut hup = signal(SignalKind::hangup())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        loop {
            let command = tokio::select! {
                _ = usr1.recv() => MonitorCommand::BlockCurrent,
                _ = usr2.recv() => MonitorCommand::UnblockCurrent,
                _ = hup.recv() => MonitorCommand::ToggleAutomute,
                _ = term.recv() => MonitorCommand::Shutdown,
                _ = int.recv() => MonitorCommand::Shutdown,
            };
            info!("Signal received: {:?}", command);
            if tx.send(command).await.is_err() || command == MonitorCommand::Shutdown {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
pub fn spawn_signal_listener(tx: mpsc::Sender<MonitorCommand>) -> std::io::Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received.");
            let _ = tx.send(MonitorCommand::Shutdown).await;
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlocklistConfig;

    #[tokio::test]
    async fn test_init_blocklist_without_remotes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("list"), "one\ntwo\n").unwrap();
        let config = Config {
            blocklist: BlocklistConfig {
                path: Some(dir.path().join("list")),
                remotes_path: Some(dir.path().join("remotes.yaml")),
                ..BlocklistConfig::default()
            },
            ..Config::default()
        };

        let store = init_blocklist(&config, ActionLogger::disabled())
            .await
            .unwrap();
        assert_eq!(store.entries(), ["one", "two"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_init_blocklist_unusable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            blocklist: BlocklistConfig {
                path: Some(dir.path().to_path_buf()),
                load_remotes: false,
                ..BlocklistConfig::default()
            },
            ..Config::default()
        };

        assert!(init_blocklist(&config, ActionLogger::disabled())
            .await
            .is_err());
    }

    #[test]
    fn test_filter_quiets_http_crates() {
        let logging = LoggingConfig {
            level: "debug,reqwest=trace".to_string(),
            ..LoggingConfig::default()
        };
        let filter = build_filter(&logging, None).to_string();
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("reqwest=trace"));
        assert!(!filter.contains("reqwest=warn"));
    }

    #[test]
    fn test_env_filter_overrides_config() {
        let logging = LoggingConfig::default();

        let filter = build_filter(&logging, Some("blockify=trace")).to_string();
        assert!(filter.contains("blockify=trace"));
        assert!(!filter.contains("hyper=warn"));

        let filter = build_filter(&logging, Some("  ")).to_string();
        assert!(filter.contains("hyper=warn"));
    }
}
