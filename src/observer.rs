//! Access to the titles of the open windows.

use crate::error::Result;
use crate::runner::CommandRunner;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait WindowObserver: Send + Sync {
    /// Titles of all open windows, in no particular order.
    async fn window_titles(&self) -> Result<Vec<String>>;
}

/// Lists windows through `wmctrl -l`.
pub struct WmctrlObserver {
    runner: Arc<dyn CommandRunner>,
}

impl WmctrlObserver {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    // `wmctrl -l` prints: <window id> <desktop> <host> <title...>
    fn parse_line(line: &str) -> Option<String> {
        let mut rest = line.trim_start();
        for _ in 0..3 {
            let idx = rest.find(char::is_whitespace)?;
            rest = rest[idx..].trim_start();
        }
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }
}

#[async_trait::async_trait]
impl WindowObserver for WmctrlObserver {
    async fn window_titles(&self) -> Result<Vec<String>> {
        let out = self.runner.output("wmctrl", &["-l"]).await?;
        Ok(out.lines().filter_map(Self::parse_line).collect())
    }
}
