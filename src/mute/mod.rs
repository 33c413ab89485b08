pub mod mixer;
pub mod sink;
pub mod types;

pub use self::types::{BackendPreference, Channel, MuteBackendKind, MuteDecision};

use crate::error::Result;
use crate::logger::{ActionKind, ActionLogEntry, ActionLogger};
use crate::runner::CommandRunner;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const PACMD: &str = "pacmd";
const PIDOF: &str = "pidof";

/// Mutes and unmutes the player through whichever mechanism works on this host.
///
/// The kind is picked once at construction. A failing sink-control query
/// downgrades to the pulse mixer for the rest of the run; nothing upgrades it
/// again.
pub struct MuteBackend {
    kind: MuteBackendKind,
    channels: Vec<Channel>,
    runner: Arc<dyn CommandRunner>,
    process_name: String,
    logger: Arc<ActionLogger>,
}

impl MuteBackend {
    /// Builds a backend for the `backend` config value (`auto`, `sink`,
    /// `pulse` or `alsa`). `auto` and unknown values run the probe.
    pub async fn new(
        runner: Arc<dyn CommandRunner>,
        process_name: impl Into<String>,
        preference: &str,
        logger: Arc<ActionLogger>,
    ) -> Self {
        let kind = match BackendPreference::from_config(preference) {
            Some(BackendPreference::Pinned(kind)) => {
                info!("Mute backend pinned to {}", kind);
                kind
            }
            Some(BackendPreference::Auto) => Self::probe(runner.as_ref()).await,
            None => {
                warn!("Unknown mute backend '{}', probing instead", preference);
                Self::probe(runner.as_ref()).await
            }
        };
        let channels = mixer::discover_channels(runner.as_ref()).await;

        Self::with_kind(runner, process_name, kind, channels, logger)
    }

    pub fn with_kind(
        runner: Arc<dyn CommandRunner>,
        process_name: impl Into<String>,
        kind: MuteBackendKind,
        mut channels: Vec<Channel>,
        logger: Arc<ActionLogger>,
    ) -> Self {
        if !channels.contains(&Channel::primary()) {
            channels.insert(0, Channel::primary());
        }
        Self {
            kind,
            channels,
            runner,
            process_name: process_name.into(),
            logger,
        }
    }

    /// Prefers sink control when the sink listing works at all. This is only a
    /// hint: sink control may still fail later and fall back.
    pub async fn probe(runner: &dyn CommandRunner) -> MuteBackendKind {
        match runner.output(PACMD, &["list-sink-inputs"]).await {
            Ok(_) => {
                info!("Sink inputs are listable, using sink control");
                MuteBackendKind::SinkControl
            }
            Err(e) => {
                info!("Sink control unavailable ({}), using the ALSA mixer", e);
                MuteBackendKind::MixerAlsa
            }
        }
    }

    pub fn kind(&self) -> MuteBackendKind {
        self.kind
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub async fn is_muted(&self, channel: &Channel) -> Result<bool> {
        mixer::is_muted(self.runner.as_ref(), self.kind, channel).await
    }

    /// Brings the player to the requested state (`force` = muted) and returns
    /// what was done about it.
    pub async fn toggle(&mut self, force: bool) -> MuteDecision {
        match self.kind {
            MuteBackendKind::SinkControl => self.toggle_sink(force).await,
            MuteBackendKind::MixerPulse | MuteBackendKind::MixerAlsa => {
                self.toggle_mixer(force).await
            }
        }
    }

    async fn toggle_mixer(&self, force: bool) -> MuteDecision {
        let primary = &self.channels[0];
        let muted = match self.is_muted(primary).await {
            Ok(muted) => muted,
            Err(e) => {
                warn!("Could not read mixer state of {}: {}", primary, e);
                return MuteDecision::NoOp;
            }
        };

        let decision = MuteDecision::decide(muted, force);
        if decision == MuteDecision::NoOp {
            return decision;
        }

        let mute = decision == MuteDecision::Mute;
        for channel in &self.channels {
            debug!(
                "{} {} via {}",
                if mute { "Muting" } else { "Unmuting" },
                channel,
                self.kind
            );
            if let Err(e) = mixer::set(self.runner.as_ref(), self.kind, channel, mute) {
                warn!("Failed to set {} on {}: {}", channel, self.kind, e);
            }
        }
        decision
    }

    async fn query_sinks(&self) -> Result<(String, String)> {
        let listing = self.runner.output(PACMD, &["list-sink-inputs"]).await?;
        let pids = self.runner.output(PIDOF, &[self.process_name.as_str()]).await?;
        Ok((listing, pids))
    }

    async fn toggle_sink(&mut self, force: bool) -> MuteDecision {
        let (listing, pids) = match self.query_sinks().await {
            Ok(out) => out,
            Err(e) => {
                error!(
                    "Sink or process not found ({}). Is PulseAudio/{} running?",
                    e, self.process_name
                );
                self.downgrade(MuteBackendKind::MixerPulse, e.to_string());
                return MuteDecision::NoOp;
            }
        };

        let inputs = sink::parse_sink_inputs(&listing);
        let pids: Vec<&str> = pids.split_whitespace().collect();
        let Some(input) = sink::find_target(&inputs, &pids) else {
            debug!("No sink input owned by {} yet", self.process_name);
            return MuteDecision::NoOp;
        };

        let Some(muted) = input.muted else {
            warn!("Unrecognised mute state on sink input {}", input.index);
            return MuteDecision::NoOp;
        };

        let decision = MuteDecision::decide(muted, force);
        let flag = match decision {
            MuteDecision::Mute => "1",
            MuteDecision::Unmute => "0",
            MuteDecision::NoOp => return decision,
        };

        if let Err(e) = self
            .runner
            .output(PACMD, &["set-sink-input-mute", input.index.as_str(), flag])
            .await
        {
            warn!("Failed to set mute on sink input {}: {}", input.index, e);
        }
        decision
    }

    fn downgrade(&mut self, to: MuteBackendKind, reason: String) {
        error!("Falling back from {} to {}", self.kind, to);
        self.kind = to;
        self.logger.log(
            ActionLogEntry::new(ActionKind::BackendDowngraded)
                .with_backend(to)
                .with_detail(reason),
        );
    }
}
