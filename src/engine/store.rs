use super::remote::{fetch_all, RemoteSource};
use super::traits::RemoteFetcher;
use crate::error::{BlockifyError, Result};
use crate::logger::{ActionKind, ActionLogEntry, ActionLogger};
use rustc_hash::FxHashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Ordered, deduplicated blocklist backed by a text file with one entry per line.
///
/// Every mutating call rewrites the file before returning.
pub struct BlockStore {
    path: PathBuf,
    entries: Vec<String>,
    // Modification time of the file as last written or read by us.
    timestamp: Option<SystemTime>,
    logger: Arc<ActionLogger>,
}

fn normalize(entry: &str) -> Option<String> {
    let entry = entry.trim();
    if entry.is_empty() {
        None
    } else {
        Some(entry.to_string())
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn read_entries(path: &Path) -> Result<Vec<String>> {
    debug!("Loading blocklist from {}", path.display());
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("Creating empty blocklist at {}", path.display());
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| BlockifyError::storage(parent, e))?;
            }
            fs::File::create(path).map_err(|e| BlockifyError::storage(path, e))?;
            String::new()
        }
        Err(e) => return Err(BlockifyError::storage(path, e)),
    };

    let mut seen = FxHashSet::default();
    Ok(contents
        .lines()
        .filter_map(normalize)
        .filter(|entry| seen.insert(entry.clone()))
        .collect())
}

impl BlockStore {
    /// Loads the blocklist at `path`, creating an empty file if there is none.
    pub fn open(path: impl Into<PathBuf>, logger: Arc<ActionLogger>) -> Result<Self> {
        let path = path.into();
        let entries = read_entries(&path)?;
        let timestamp = modified(&path);
        Ok(Self {
            path,
            entries,
            timestamp,
            logger,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.iter().any(|e| e == entry)
    }

    /// Adds `entry` and persists. Returns false without touching the file
    /// when the entry is blank or already listed.
    pub fn append(&mut self, entry: &str) -> Result<bool> {
        let entry = match normalize(entry) {
            Some(e) if !self.contains(&e) => e,
            _ => {
                debug!("Not adding empty or duplicate entry: {:?}", entry);
                return Ok(false);
            }
        };

        info!("Adding '{}' to {}", entry, self.path.display());
        self.entries.push(entry.clone());
        self.persist()?;
        self.logger
            .log(ActionLogEntry::new(ActionKind::Blocked).with_track(entry));
        Ok(true)
    }

    /// Removes `entry` and persists. Returns false when it was not listed.
    pub fn remove(&mut self, entry: &str) -> Result<bool> {
        let Some(pos) = self.entries.iter().position(|e| e == entry) else {
            warn!("Could not remove '{}': not in the blocklist", entry);
            return Ok(false);
        };

        info!("Removing '{}' from {}", entry, self.path.display());
        let removed = self.entries.remove(pos);
        self.persist()?;
        self.logger
            .log(ActionLogEntry::new(ActionKind::Unblocked).with_track(removed));
        Ok(true)
    }

    /// True when the file was modified (or removed) since we last read or wrote it.
    pub fn has_changed_on_disk(&self) -> bool {
        match modified(&self.path) {
            Some(current) => Some(current) != self.timestamp,
            None => self.timestamp.is_some(),
        }
    }

    /// Replaces the in-memory entries with the file's current content.
    ///
    /// On failure the entries are kept and the file's current state is still
    /// recorded, so the same broken edit is not retried until it changes again.
    pub fn reload(&mut self) -> Result<()> {
        let result = read_entries(&self.path);
        self.timestamp = modified(&self.path);
        let entries = result?;
        let previous = std::mem::replace(&mut self.entries, entries);
        self.logger.log(
            ActionLogEntry::new(ActionKind::Reloaded)
                .with_detail(format!("{} -> {} entries", previous.len(), self.entries.len())),
        );
        Ok(())
    }

    /// Rewrites the whole file through a temporary sibling and a rename.
    ///
    /// A symlinked list is written through to its target, and the existing
    /// file's permissions carry over to the replacement.
    pub fn persist(&mut self) -> Result<()> {
        debug!("Saving blocklist to {}", self.path.display());
        let mut contents = self.entries.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }

        let target = fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        let permissions = fs::metadata(&target).map(|m| m.permissions()).ok();
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "blocklist".to_string());
        let tmp = target.with_file_name(format!("{}.tmp", file_name));

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            if let Some(permissions) = permissions {
                fs::set_permissions(&tmp, permissions)?;
            }
            fs::rename(&tmp, &target)
        };
        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(BlockifyError::storage(&self.path, e));
        }

        self.timestamp = modified(&self.path);
        Ok(())
    }

    /// Merges remote lists into the store.
    ///
    /// Sources are applied in order, so an entry present in several sources is
    /// attributed to the first one. A failing source is logged and skipped.
    /// Returns the number of entries added; the file is persisted only if that
    /// is non-zero.
    pub async fn merge_remote(
        &mut self,
        sources: &[RemoteSource],
        fetcher: &dyn RemoteFetcher,
        concurrency: usize,
    ) -> Result<usize> {
        let results = fetch_all(fetcher, sources, concurrency).await;
        let mut seen: FxHashSet<String> = self.entries.iter().cloned().collect();
        let mut added_total = 0;

        for (source, result) in sources.iter().zip(results) {
            let lines = match result {
                Ok(lines) => lines,
                Err(e) => {
                    warn!("Couldn't load '{}' from {}: {}", source.name, source.url, e);
                    continue;
                }
            };

            let added: Vec<String> = lines
                .iter()
                .map(String::as_str)
                .filter_map(normalize)
                .filter(|entry| seen.insert(entry.clone()))
                .collect();

            if added.is_empty() {
                info!("No new content from remote list '{}'", source.name);
                continue;
            }

            info!(
                "Importing {} entries from remote list '{}'",
                added.len(),
                source.name
            );
            self.logger.log(
                ActionLogEntry::new(ActionKind::RemoteImported)
                    .with_detail(format!("'{}' (+{})", source.name, added.len())),
            );
            added_total += added.len();
            self.entries.extend(added);
        }

        if added_total > 0 {
            self.persist()?;
        }
        Ok(added_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MemoryLogSink;
    use std::collections::HashMap;
    use std::time::Duration;

    fn open_in(dir: &tempfile::TempDir) -> BlockStore {
        BlockStore::open(dir.path().join(".blockify_list"), ActionLogger::disabled()).unwrap()
    }

    #[test]
    fn test_open_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_in(&dir);

        assert!(store.is_empty());
        assert!(store.path().exists());
        assert!(!store.has_changed_on_disk());
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/list");
        let store = BlockStore::open(&path, ActionLogger::disabled()).unwrap();
        assert!(store.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_load_drops_blanks_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list");
        fs::write(&path, "one\n\n   \ntwo\r\none\n three \n").unwrap();

        let store = BlockStore::open(&path, ActionLogger::disabled()).unwrap();
        assert_eq!(store.entries(), ["one", "two", "three"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as text.
        let path = dir.path().join("list");
        fs::create_dir(&path).unwrap();

        let err = BlockStore::open(&path, ActionLogger::disabled())
            .err()
            .unwrap();
        assert!(matches!(err, BlockifyError::Storage { .. }));
    }

    #[test]
    fn test_append_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_in(&dir);

        assert!(store.append("Artist Name").unwrap());
        assert!(!store.append("Artist Name").unwrap());
        assert!(!store.append("  Artist Name ").unwrap());
        assert_eq!(store.entries(), ["Artist Name"]);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "Artist Name\n");
    }

    #[test]
    fn test_append_rejects_blank() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_in(&dir);

        assert!(!store.append("").unwrap());
        assert!(!store.append(" ").unwrap());
        assert!(!store.append("\t\n").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_in(&dir);
        store.append("a").unwrap();

        assert!(!store.remove("b").unwrap());
        assert_eq!(store.entries(), ["a"]);

        assert!(store.remove("a").unwrap());
        assert!(store.is_empty());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "");
    }

    #[test]
    fn test_persist_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_in(&dir);
        for entry in ["zeta", "alpha", "Mid Song - Live"] {
            store.append(entry).unwrap();
        }

        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "zeta\nalpha\nMid Song - Live\n"
        );

        let reopened = open_in(&dir);
        assert_eq!(reopened.entries(), store.entries());
        assert!(!dir.path().join(".blockify_list.tmp").exists());
    }

    #[test]
    fn test_external_edit_detected_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let memory = MemoryLogSink::new(10);
        let logger = ActionLogger::with_sinks(vec![Box::new(memory.clone())]);
        let mut store = BlockStore::open(dir.path().join("list"), logger).unwrap();
        store.append("a").unwrap();
        assert!(!store.has_changed_on_disk());

        fs::write(store.path(), "a\nb\n").unwrap();
        let file = fs::File::options().write(true).open(store.path()).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        assert!(store.has_changed_on_disk());
        store.reload().unwrap();
        assert_eq!(store.entries(), ["a", "b"]);
        assert!(!store.has_changed_on_disk());
        assert_eq!(
            memory.get_recent().last().map(|e| e.action),
            Some(ActionKind::Reloaded)
        );
    }

    #[test]
    fn test_deleted_file_counts_as_changed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_in(&dir);
        store.append("a").unwrap();

        fs::remove_file(store.path()).unwrap();
        assert!(store.has_changed_on_disk());
        store.reload().unwrap();
        assert!(store.is_empty());
        assert!(store.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_reload_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_in(&dir);
        store.append("a").unwrap();

        // A directory in place of the list cannot be read back.
        fs::remove_file(store.path()).unwrap();
        fs::create_dir(store.path()).unwrap();
        fs::File::open(store.path())
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        assert!(store.has_changed_on_disk());
        assert!(matches!(
            store.reload(),
            Err(BlockifyError::Storage { .. })
        ));
        assert_eq!(store.entries(), ["a"]);
        assert!(!store.has_changed_on_disk());
    }

    #[cfg(unix)]
    #[test]
    fn test_persist_keeps_symlink_and_mode() {
        use std::os::unix::fs::{symlink, PermissionsExt};

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("dotfiles").join("blockify_list");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "a\n").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o600)).unwrap();
        let link = dir.path().join(".blockify_list");
        symlink(&target, &link).unwrap();

        let mut store = BlockStore::open(&link, ActionLogger::disabled()).unwrap();
        store.append("b").unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&target).unwrap(), "a\nb\n");
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!store.has_changed_on_disk());
    }

    struct MapFetcher(HashMap<&'static str, Result<Vec<String>>>);

    impl MapFetcher {
        fn new(entries: Vec<(&'static str, Result<Vec<String>>)>) -> Self {
            Self(entries.into_iter().collect())
        }
    }

    #[async_trait::async_trait]
    impl RemoteFetcher for MapFetcher {
        async fn fetch_lines(&self, url: &str) -> Result<Vec<String>> {
            match self.0.get(url) {
                Some(Ok(lines)) => Ok(lines.clone()),
                _ => Err(BlockifyError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn source(name: &str, url: &str) -> RemoteSource {
        RemoteSource {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_merge_dedupes_across_sources() {
        let dir = tempfile::tempdir().unwrap();
        let memory = MemoryLogSink::new(10);
        let logger = ActionLogger::with_sinks(vec![Box::new(memory.clone())]);
        let mut store = BlockStore::open(dir.path().join("list"), logger).unwrap();
        store.append("a").unwrap();
        store.append("b").unwrap();

        let fetcher = MapFetcher::new(vec![
            ("https://one", Ok(lines(&["b", "", "c", "c"]))),
            ("https://two", Ok(lines(&["c", "b"]))),
        ]);
        let sources = vec![source("one", "https://one"), source("two", "https://two")];

        let added = store.merge_remote(&sources, &fetcher, 2).await.unwrap();
        assert_eq!(added, 1);
        assert_eq!(store.entries(), ["a", "b", "c"]);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "a\nb\nc\n");

        let imports: Vec<_> = memory
            .get_recent()
            .into_iter()
            .filter(|e| e.action == ActionKind::RemoteImported)
            .collect();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].detail.as_deref(), Some("'one' (+1)"));
    }

    #[tokio::test]
    async fn test_merge_skips_failed_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_in(&dir);

        let fetcher = MapFetcher::new(vec![("https://ok", Ok(lines(&["x", "  ", "y"])))]);
        let sources = vec![
            source("down", "https://down"),
            source("ok", "https://ok"),
        ];

        let added = store.merge_remote(&sources, &fetcher, 1).await.unwrap();
        assert_eq!(added, 2);
        assert_eq!(store.entries(), ["x", "y"]);
    }

    #[tokio::test]
    async fn test_merge_without_news_does_not_persist() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_in(&dir);
        store.append("a").unwrap();
        let before = modified(store.path());

        let fetcher = MapFetcher::new(vec![("https://one", Ok(lines(&["a", ""])))]);
        let added = store
            .merge_remote(&[source("one", "https://one")], &fetcher, 1)
            .await
            .unwrap();

        assert_eq!(added, 0);
        assert_eq!(modified(store.path()), before);
        assert!(!store.has_changed_on_disk());
    }
}
