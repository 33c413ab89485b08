use super::store::BlockStore;
use super::traits::BlocklistMatcher;

impl BlocklistMatcher for BlockStore {
    // Plain case-sensitive substring test, first entry in list order wins.
    fn find_match(&self, title: &str) -> Option<&str> {
        if title.is_empty() {
            return None;
        }
        self.entries()
            .iter()
            .find(|entry| title.contains(entry.as_str()))
            .map(|entry| entry.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::ActionLogger;

    fn store_with(entries: &[&str]) -> (tempfile::TempDir, BlockStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list");
        let mut store = BlockStore::open(&path, ActionLogger::disabled()).unwrap();
        for e in entries {
            store.append(e).unwrap();
        }
        (dir, store)
    }

    #[test]
    fn test_substring_match() {
        let (_dir, store) = store_with(&["Artist Name", "Jingle"]);

        assert_eq!(
            store.find_match("Artist Name Track Title"),
            Some("Artist Name")
        );
        assert_eq!(store.find_match("Radio Jingle 3"), Some("Jingle"));
        assert_eq!(store.find_match("Someone Else"), None);
        assert_eq!(store.find_match(""), None);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let (_dir, store) = store_with(&["Artist Name"]);
        assert_eq!(store.find_match("artist name track"), None);
    }

    #[test]
    fn test_first_entry_wins() {
        let (_dir, store) = store_with(&["Track", "Artist"]);
        assert_eq!(store.find_match("Artist - Track"), Some("Track"));
    }

    #[test]
    fn test_short_entries_match_anywhere() {
        let (_dir, store) = store_with(&["the"]);
        assert_eq!(store.find_match("Leather Jacket"), Some("the"));
    }
}
