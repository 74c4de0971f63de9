use std::fs;
use std::path::PathBuf;

use animehub_core::store::persist::{PersistError, StateStore};

/// File-backed state store: one `<key>.json` per storage key under a data
/// directory. Writes go to a temp file first and are renamed into place, so
/// a crash mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Creates the data directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStore for FileStateStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.path(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), PersistError> {
        let path = self.path(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, blob)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use animehub_core::store::persist::StateStore;

    use super::FileStateStore;

    #[test]
    fn missing_key_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).unwrap();
        assert!(store.load("nothing").unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).unwrap();
        store.save("discussions-storage", r#"{"threads":[]}"#).unwrap();
        assert_eq!(
            store.load("discussions-storage").unwrap().as_deref(),
            Some(r#"{"threads":[]}"#)
        );
        assert!(dir.path().join("discussions-storage.json").exists());
    }

    #[test]
    fn save_overwrites_whole_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).unwrap();
        store.save("key", "first").unwrap();
        store.save("key", "second").unwrap();
        assert_eq!(store.load("key").unwrap().as_deref(), Some("second"));
        // no temp file left behind
        assert!(!dir.path().join("key.json.tmp").exists());
    }

    #[test]
    fn open_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("state");
        let store = FileStateStore::open(&nested).unwrap();
        store.save("key", "blob").unwrap();
        assert!(nested.join("key.json").exists());
    }
}
