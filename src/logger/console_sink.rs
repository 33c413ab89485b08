use crate::config::LoggingConfig;
use crate::logger::types::{ActionKind, ActionLogEntry, ActionLogSink};
use tracing::info;

pub struct ConsoleLogSink {
    config: LoggingConfig,
}

impl ConsoleLogSink {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    fn render(entry: &ActionLogEntry) -> String {
        let track = entry.track.as_deref().unwrap_or("");
        let via = entry
            .backend
            .map(|b| format!(" via {}", b))
            .unwrap_or_default();

        match entry.action {
            ActionKind::Muted => format!("muted '{}'{}", track, via),
            ActionKind::Unmuted => format!("unmuted{}", via),
            ActionKind::Blocked => format!("added '{}' to the blocklist", track),
            ActionKind::Unblocked => format!("removed '{}' from the blocklist", track),
            ActionKind::Reloaded => format!(
                "blocklist reloaded ({})",
                entry.detail.as_deref().unwrap_or("changed on disk")
            ),
            ActionKind::RemoteImported => format!(
                "imported remote list {}",
                entry.detail.as_deref().unwrap_or("")
            ),
            ActionKind::BackendDowngraded => format!(
                "mute backend downgraded to {} ({})",
                entry
                    .backend
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                entry.detail.as_deref().unwrap_or("command failed")
            ),
        }
    }
}

impl ActionLogSink for ConsoleLogSink {
    fn log(&self, entry: &ActionLogEntry) {
        if self.config.format == "json" {
            info!(
                target: "blockify_action",
                action = ?entry.action,
                track = ?entry.track,
                backend = ?entry.backend,
                detail = ?entry.detail
            );
        } else {
            info!(target: "blockify_action", "{}", Self::render(entry));
        }
    }
}
