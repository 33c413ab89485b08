use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_player")]
    pub player: String,

    #[serde(default = "default_process_name")]
    pub process_name: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_automute")]
    pub automute: bool,

    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default)]
    pub blocklist: BlocklistConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlocklistConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub remotes_path: Option<PathBuf>,
    #[serde(default = "default_load_remotes")]
    pub load_remotes: bool,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_concurrent_downloads")]
    pub concurrent_downloads: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default = "default_action_log_sinks")]
    pub action_log_sinks: Vec<String>,
}

// Defaults
fn default_player() -> String {
    "Spotify".to_string()
}
fn default_process_name() -> String {
    "spotify".to_string()
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_automute() -> bool {
    true
}
fn default_backend() -> String {
    "auto".to_string()
}
fn default_load_remotes() -> bool {
    true
}
fn default_fetch_timeout() -> u64 {
    10
}
fn default_concurrent_downloads() -> usize {
    4
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_action_log_sinks() -> Vec<String> {
    vec!["console".to_string()]
}

fn home_file(name: &str) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(name)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player: default_player(),
            process_name: default_process_name(),
            poll_interval_ms: default_poll_interval_ms(),
            automute: default_automute(),
            backend: default_backend(),
            blocklist: BlocklistConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BlocklistConfig {
    fn default() -> Self {
        Self {
            path: None,
            remotes_path: None,
            load_remotes: default_load_remotes(),
            fetch_timeout_secs: default_fetch_timeout(),
            concurrent_downloads: default_concurrent_downloads(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file_path: None,
            quiet: false,
            action_log_sinks: default_action_log_sinks(),
        }
    }
}

impl BlocklistConfig {
    /// Location of the blocklist file, `~/.blockify_list` unless configured.
    pub fn list_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| home_file(".blockify_list"))
    }

    /// Location of the remote sources file, `~/.blockify_remotes.yaml` unless configured.
    pub fn remotes_path(&self) -> PathBuf {
        self.remotes_path
            .clone()
            .unwrap_or_else(|| home_file(".blockify_remotes.yaml"))
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config TOML")?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
