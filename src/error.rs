//! Error types shared by the blocklist store, the mute backends and remote fetching.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlockifyError>;

#[derive(Debug, Error)]
pub enum BlockifyError {
    /// The blocklist file could not be created, read or written.
    #[error("Blocklist storage error at '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Command not found: {program}")]
    CommandNotFound { program: String },

    #[error("Command '{program}' exited with status {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: i32,
        stderr: String,
    },

    #[error("Failed to run '{program}': {source}")]
    CommandIo {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Remote {url} answered with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid remotes file '{path}': {message}")]
    RemotesFile { path: PathBuf, message: String },
}

impl BlockifyError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// True for failures of an external command, as opposed to storage or network.
    pub fn is_command_error(&self) -> bool {
        matches!(
            self,
            Self::CommandNotFound { .. } | Self::CommandFailed { .. } | Self::CommandIo { .. }
        )
    }
}
