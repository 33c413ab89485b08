use crate::mute::MuteBackendKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLogEntry {
    pub action: ActionKind,
    pub track: Option<String>,
    pub backend: Option<MuteBackendKind>,
    pub detail: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ActionKind {
    Muted,
    Unmuted,
    Blocked,
    Unblocked,
    Reloaded,
    RemoteImported,
    BackendDowngraded,
}

impl ActionLogEntry {
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            track: None,
            backend: None,
            detail: None,
        }
    }

    pub fn with_track(mut self, track: impl Into<String>) -> Self {
        self.track = Some(track.into());
        self
    }

    pub fn with_backend(mut self, backend: MuteBackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub trait ActionLogSink: Send + Sync {
    fn log(&self, entry: &ActionLogEntry);
}
