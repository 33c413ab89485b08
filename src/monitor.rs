use crate::engine::{BlockStore, BlocklistMatcher, MonitorState};
use crate::logger::{ActionKind, ActionLogEntry, ActionLogger};
use crate::mute::{MuteBackend, MuteDecision};
use crate::observer::WindowObserver;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Requests delivered to the control loop between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    BlockCurrent,
    UnblockCurrent,
    ToggleAutomute,
    Shutdown,
}

/// Polls the player's window title and keeps the mute state in line with the blocklist.
pub struct PlaybackMonitor {
    store: BlockStore,
    // Blocklist content at startup, compared on shutdown.
    startup_entries: Vec<String>,
    backend: MuteBackend,
    observer: Arc<dyn WindowObserver>,
    marker: String,
    current_track: Option<String>,
    automute: bool,
    state: MonitorState,
    logger: Arc<ActionLogger>,
}

impl PlaybackMonitor {
    pub fn new(
        store: BlockStore,
        backend: MuteBackend,
        observer: Arc<dyn WindowObserver>,
        player: &str,
        logger: Arc<ActionLogger>,
    ) -> Self {
        let startup_entries = store.entries().to_vec();
        Self {
            store,
            startup_entries,
            backend,
            observer,
            marker: format!("{} - ", player),
            current_track: None,
            automute: true,
            state: MonitorState::Idle,
            logger,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn current_track(&self) -> Option<&str> {
        self.current_track.as_deref()
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn backend(&self) -> &MuteBackend {
        &self.backend
    }

    pub fn automute(&self) -> bool {
        self.automute
    }

    pub fn set_automute(&mut self, enabled: bool) {
        info!(
            "Automute {}",
            if enabled { "enabled" } else { "disabled" }
        );
        self.automute = enabled;
    }

    /// Pulls the track out of a `"<player> - <track>"` window title.
    fn extract_track(&self, titles: &[String]) -> Option<String> {
        titles
            .iter()
            .find_map(|title| {
                title
                    .find(&self.marker)
                    .map(|idx| &title[idx + self.marker.len()..])
            })
            .map(|rest| rest.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|track| !track.is_empty())
    }

    async fn apply(&mut self, force: bool) -> MuteDecision {
        let decision = self.backend.toggle(force).await;
        let action = match decision {
            MuteDecision::Mute => ActionKind::Muted,
            MuteDecision::Unmute => ActionKind::Unmuted,
            MuteDecision::NoOp => return decision,
        };

        let mut entry = ActionLogEntry::new(action).with_backend(self.backend.kind());
        if let (ActionKind::Muted, Some(track)) = (action, &self.current_track) {
            entry = entry.with_track(track.clone());
        }
        self.logger.log(entry);
        decision
    }

    /// Unmutes once at startup in case a previous run died while muted.
    pub async fn start(&mut self) {
        self.apply(false).await;
    }

    /// One polling step.
    pub async fn tick(&mut self) -> MonitorState {
        let titles = match self.observer.window_titles().await {
            Ok(titles) => titles,
            Err(e) => {
                warn!("Could not list windows: {}", e);
                Vec::new()
            }
        };

        let track = self.extract_track(&titles);
        if track != self.current_track {
            if let Some(track) = &track {
                debug!("Now playing: {}", track);
            }
        }
        self.current_track = track;

        let Some(track) = self.current_track.clone() else {
            self.state = MonitorState::Idle;
            return self.state;
        };
        if !self.automute {
            self.state = MonitorState::Idle;
            return self.state;
        }

        self.state = MonitorState::Evaluating;

        if self.store.has_changed_on_disk() {
            info!("Blocklist changed on disk, reloading");
            if let Err(e) = self.store.reload() {
                error!("Failed to reload blocklist: {}", e);
            }
        }

        let blocked = self.store.find_match(&track).map(str::to_string);
        match blocked {
            Some(entry) => {
                debug!("'{}' matches blocklist entry '{}'", track, entry);
                self.apply(true).await;
                self.state = MonitorState::Muted;
            }
            None => {
                self.apply(false).await;
                self.state = MonitorState::Unmuted;
            }
        }
        self.state
    }

    pub fn block_current(&mut self) {
        let Some(track) = self.current_track.clone() else {
            debug!("Nothing playing, nothing to block");
            return;
        };
        if let Err(e) = self.store.append(&track) {
            error!("Failed to block '{}': {}", track, e);
        }
    }

    pub fn unblock_current(&mut self) {
        let Some(track) = self.current_track.clone() else {
            debug!("Nothing playing, nothing to unblock");
            return;
        };
        if let Err(e) = self.store.remove(&track) {
            error!("Failed to unblock '{}': {}", track, e);
        }
    }

    /// Saves the blocklist if it changed during the run, then unmutes.
    /// The save comes first so a failing unmute can't lose edits.
    pub async fn shutdown(&mut self) {
        info!("Exiting safely. Bye.");
        if self.store.entries() != self.startup_entries.as_slice() {
            if let Err(e) = self.store.persist() {
                error!("Failed to save blocklist on exit: {}", e);
            }
        }
        self.apply(false).await;
    }

    pub async fn handle(&mut self, command: MonitorCommand) {
        debug!("Handling {:?}", command);
        match command {
            MonitorCommand::BlockCurrent => self.block_current(),
            MonitorCommand::UnblockCurrent => self.unblock_current(),
            MonitorCommand::ToggleAutomute => {
                let enabled = !self.automute;
                self.set_automute(enabled);
            }
            MonitorCommand::Shutdown => self.shutdown().await,
        }
    }

    /// Runs ticks every `interval` and applies commands between them until
    /// a shutdown command arrives.
    pub async fn run(mut self, mut commands: mpsc::Receiver<MonitorCommand>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                command = commands.recv(), if commands_open => {
                    match command {
                        Some(MonitorCommand::Shutdown) => {
                            self.shutdown().await;
                            break;
                        }
                        Some(command) => self.handle(command).await,
                        None => commands_open = false,
                    }
                }
            }
        }
    }
}
