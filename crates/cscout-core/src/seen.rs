//! Persisted set of already-processed message ids.
//!
//! The backing file is a JSON array of integers. A missing, empty or malformed
//! file is never an error: the store resets to `[]` and starts over.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{domain::MessageId, errors::Error, Result};

#[derive(Clone, Debug)]
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the seen set, resetting the file on absence or corruption.
    pub fn load(&self) -> HashSet<MessageId> {
        let txt = match fs::read_to_string(&self.path) {
            Ok(txt) => txt,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.reset();
                return HashSet::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read seen ids");
                return HashSet::new();
            }
        };

        if txt.trim().is_empty() {
            self.reset();
            return HashSet::new();
        }

        match parse_ids(&self.path, &txt) {
            Ok(ids) => {
                debug!(path = %self.path.display(), count = ids.len(), "Loaded seen ids");
                ids
            }
            Err(e) => {
                warn!(error = %e, "Seen-id file corrupt, resetting");
                self.reset();
                HashSet::new()
            }
        }
    }

    /// Overwrite the file with `ids` (sorted) via a sibling temp file + rename.
    pub fn save(&self, ids: &HashSet<MessageId>) -> Result<()> {
        let mut sorted: Vec<i64> = ids.iter().map(|id| id.0).collect();
        sorted.sort_unstable();
        let txt = serde_json::to_string_pretty(&sorted)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, txt)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), count = sorted.len(), "Saved seen ids");
        Ok(())
    }

    fn reset(&self) {
        if let Err(e) = fs::write(&self.path, "[]") {
            warn!(path = %self.path.display(), error = %e, "Failed to reset seen-id file");
        }
    }
}

fn parse_ids(path: &Path, txt: &str) -> Result<HashSet<MessageId>> {
    let value: serde_json::Value = serde_json::from_str(txt)?;
    let serde_json::Value::Array(items) = value else {
        return Err(Error::SeenFile {
            path: path.to_path_buf(),
            reason: "not a JSON array".to_string(),
        });
    };

    let mut out = HashSet::with_capacity(items.len());
    for item in items {
        let id = match &item {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        let Some(id) = id else {
            return Err(Error::SeenFile {
                path: path.to_path_buf(),
                reason: format!("not an integer id: {item}"),
            });
        };
        out.insert(MessageId(id));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> SeenStore {
        SeenStore::new(dir.path().join("seen.json"))
    }

    fn ids(v: &[i64]) -> HashSet<MessageId> {
        v.iter().copied().map(MessageId).collect()
    }

    #[test]
    fn missing_file_loads_empty_and_is_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.load().is_empty());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[test]
    fn empty_file_loads_empty_and_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "  \n").unwrap();

        assert!(store.load().is_empty());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[test_log::test]
    fn malformed_file_loads_empty_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        for junk in ["{not json", "{\"a\": 1}", "[1, \"two\", 3]", "[1.5]", "42"] {
            fs::write(store.path(), junk).unwrap();
            assert!(store.load().is_empty(), "input: {junk}");
            assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
        }
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "[1, \"2\", 3]").unwrap();

        assert_eq!(store.load(), ids(&[1, 2, 3]));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let set = ids(&[9, 3, 120_000, 7]);

        store.save(&set).unwrap();
        assert_eq!(store.load(), set);
        assert!(!dir.path().join("seen.tmp").exists());

        let on_disk: Vec<i64> =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk, vec![3, 7, 9, 120_000]);
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.save(&ids(&[1, 2, 3])).unwrap();
        store.save(&ids(&[4])).unwrap();
        assert_eq!(store.load(), ids(&[4]));
    }
}
