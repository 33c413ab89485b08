use std::fmt;

/// Mechanism currently used to mute the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteBackendKind {
    /// Mutes only the player's own PulseAudio sink input.
    SinkControl,
    /// Mutes mixer channels through the PulseAudio ALSA plugin.
    MixerPulse,
    /// Mutes mixer channels on the default ALSA device.
    MixerAlsa,
}

/// What the `backend` config value asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendPreference {
    /// Probe the host at startup.
    Auto,
    Pinned(MuteBackendKind),
}

impl BackendPreference {
    /// `None` for values that name no backend.
    pub fn from_config(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::Auto),
            "sink" => Some(Self::Pinned(MuteBackendKind::SinkControl)),
            "pulse" => Some(Self::Pinned(MuteBackendKind::MixerPulse)),
            "alsa" => Some(Self::Pinned(MuteBackendKind::MixerAlsa)),
            _ => None,
        }
    }
}

impl fmt::Display for MuteBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SinkControl => "sink-control",
            Self::MixerPulse => "mixer-pulse",
            Self::MixerAlsa => "mixer-alsa",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteDecision {
    Mute,
    Unmute,
    NoOp,
}

impl MuteDecision {
    /// Only acts when the current state differs from the requested one.
    pub fn decide(muted: bool, force: bool) -> Self {
        match (muted, force) {
            (false, true) => Self::Mute,
            (true, false) => Self::Unmute,
            _ => Self::NoOp,
        }
    }
}

/// A named mixer channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel(String);

impl Channel {
    pub const PRIMARY: &'static str = "Master";
    pub const SECONDARY: &'static str = "Speaker";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn primary() -> Self {
        Self::new(Self::PRIMARY)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
