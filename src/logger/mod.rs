pub mod console_sink;
pub mod memory_sink;
pub mod types;

pub use self::console_sink::ConsoleLogSink;
pub use self::memory_sink::MemoryLogSink;
pub use self::types::{ActionKind, ActionLogEntry, ActionLogSink};

use crate::config::LoggingConfig;
use std::sync::Arc;
use tracing::warn;

/// Domain event log shared by the store, the mute backend and the monitor.
///
/// Sinks are invoked inline: the control loop is single threaded and every
/// sink is cheap, so there is no queue in between.
pub struct ActionLogger {
    sinks: Vec<Box<dyn ActionLogSink>>,
}

impl ActionLogger {
    /// Builds the sinks named in `action_log_sinks`. Sinks that need a reader,
    /// such as [`MemoryLogSink`], are passed in through `extra_sinks`.
    pub fn new(config: LoggingConfig, extra_sinks: Vec<Box<dyn ActionLogSink>>) -> Arc<Self> {
        let mut sinks: Vec<Box<dyn ActionLogSink>> = Vec::new();

        for sink_type in &config.action_log_sinks {
            match sink_type.as_str() {
                "console" => sinks.push(Box::new(ConsoleLogSink::new(config.clone()))),
                other => warn!("Unknown action log sink type: {}", other),
            }
        }
        sinks.extend(extra_sinks);

        Arc::new(Self { sinks })
    }

    pub fn with_sinks(sinks: Vec<Box<dyn ActionLogSink>>) -> Arc<Self> {
        Arc::new(Self { sinks })
    }

    pub fn disabled() -> Arc<Self> {
        Self::with_sinks(Vec::new())
    }

    pub fn log(&self, entry: ActionLogEntry) {
        for sink in &self.sinks {
            sink.log(&entry);
        }
    }
}
