//! Execution of the external audio and process query commands.

use crate::error::{BlockifyError, Result};
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Abstract command execution so the mute backends can be driven by mocks.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` to completion and returns its stdout.
    /// A non-zero exit status is reported as [`BlockifyError::CommandFailed`].
    async fn output(&self, program: &str, args: &[&str]) -> Result<String>;

    /// Starts `program` without waiting for it to finish.
    fn spawn(&self, program: &str, args: &[&str]) -> Result<()>;
}

fn map_io(program: &str, e: std::io::Error) -> BlockifyError {
    if e.kind() == ErrorKind::NotFound {
        BlockifyError::CommandNotFound {
            program: program.to_string(),
        }
    } else {
        BlockifyError::CommandIo {
            program: program.to_string(),
            source: e,
        }
    }
}

/// Runs commands on the host with `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

#[async_trait::async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, program: &str, args: &[&str]) -> Result<String> {
        debug!(program, ?args, "Running command");
        let out = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| map_io(program, e))?;

        if !out.status.success() {
            return Err(BlockifyError::CommandFailed {
                program: program.to_string(),
                status: out.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    fn spawn(&self, program: &str, args: &[&str]) -> Result<()> {
        debug!(program, ?args, "Spawning command");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| map_io(program, e))?;

        // Reap in the background; the outcome is only worth a debug line.
        let program = program.to_string();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => {
                    debug!(%program, ?status, "Spawned command exited unsuccessfully")
                }
                Err(e) => debug!(%program, "Failed to wait on spawned command: {}", e),
                _ => {}
            }
        });
        Ok(())
    }
}
