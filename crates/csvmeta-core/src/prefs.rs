//! Key-value preference persistence
//!
//! Preferences survive between sessions. Values are opaque JSON; callers own
//! the meaning of each key.

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Opaque key-value store for preferences
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);
}

/// Preferences that live only as long as the process
#[derive(Debug, Clone, Default)]
pub struct MemoryPrefs {
    values: BTreeMap<String, Value>,
}

impl MemoryPrefs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPrefs {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }
}

/// Preferences stored in a JSON file
#[derive(Debug, Clone)]
pub struct JsonPrefs {
    path: PathBuf,
    values: BTreeMap<String, Value>,
}

impl JsonPrefs {
    /// Load preferences from a file, or start empty if it does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                values: BTreeMap::new(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let values = serde_json::from_str(&content).map_err(Error::Json)?;
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    /// Write preferences back to the file they were loaded from
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonPrefs {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = JsonPrefs::load(dir.path().join("prefs.json")).unwrap();
        assert!(prefs.get("anything").is_none());
    }

    #[test]
    fn test_json_prefs_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut prefs = JsonPrefs::load(&path).unwrap();
        prefs.set("selected_fields", json!(["id", "title"]));
        prefs.save().unwrap();

        let reloaded = JsonPrefs::load(&path).unwrap();
        assert_eq!(reloaded.get("selected_fields"), Some(json!(["id", "title"])));
    }

    #[test]
    fn test_memory_prefs_overwrite() {
        let mut prefs = MemoryPrefs::new();
        prefs.set("k", json!(1));
        prefs.set("k", json!(2));
        assert_eq!(prefs.get("k"), Some(json!(2)));
    }
}
