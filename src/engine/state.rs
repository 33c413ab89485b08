use std::fmt;

/// Where the playback monitor stands after its last tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorState {
    /// No track is playing or automute is disabled.
    #[default]
    Idle,
    /// A track is known and the mute decision is pending.
    Evaluating,
    Muted,
    Unmuted,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Evaluating => "evaluating",
            Self::Muted => "muted",
            Self::Unmuted => "unmuted",
        };
        f.write_str(s)
    }
}
