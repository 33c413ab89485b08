use crate::error::Result;

/// Decides whether a track title is covered by the blocklist.
pub trait BlocklistMatcher {
    /// Returns the first entry contained in `title`, if any.
    fn find_match(&self, title: &str) -> Option<&str>;
}

/// Source of remote blocklist content.
#[async_trait::async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Fetches `url` and returns its body split into lines.
    async fn fetch_lines(&self, url: &str) -> Result<Vec<String>>;
}
