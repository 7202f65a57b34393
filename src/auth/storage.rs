use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Client-side key/value storage the session is read from
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// In-process store, used by embedders and tests
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::default();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

/// JSON file of key/value pairs, `tokens.json` in the config directory
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub const FILE_NAME: &'static str = "tokens.json";

    pub fn in_dir(dir: &Path) -> Self {
        Self { path: dir.join(Self::FILE_NAME) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Entries to rewrite; an unreadable file is replaced, with a warning
    fn load_for_write(&self) -> BTreeMap<String, String> {
        self.load().unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "token store unreadable, replacing it");
            BTreeMap::new()
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        // Unreadable or corrupt storage behaves like empty storage
        self.load().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self.load_for_write();
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self.load_for_write();
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fleetdesk-store-{}", uuid::Uuid::new_v4().simple()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn file_store_round_trips_and_removes() {
        let dir = temp_dir();
        let store = FileTokenStore::in_dir(&dir);
        assert_eq!(store.get("token"), None);

        store.set("token", "abc").unwrap();
        assert_eq!(store.get("token").as_deref(), Some("abc"));

        store.remove("token").unwrap();
        assert_eq!(store.get("token"), None);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = temp_dir();
        fs::write(dir.join(FileTokenStore::FILE_NAME), "{not json").unwrap();
        let store = FileTokenStore::in_dir(&dir);
        assert_eq!(store.get("token"), None);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn writing_over_a_corrupt_file_starts_fresh() {
        let dir = temp_dir();
        let path = dir.join(FileTokenStore::FILE_NAME);
        fs::write(&path, "{not json").unwrap();
        let store = FileTokenStore::in_dir(&dir);

        store.set("auth_token", "xyz").unwrap();

        let saved: BTreeMap<String, String> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(store.get("auth_token").as_deref(), Some("xyz"));
        fs::remove_dir_all(dir).ok();
    }
}
