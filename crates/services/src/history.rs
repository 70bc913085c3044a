//! Persistent conversation history.
//!
//! One JSON file holds five independent lists, one per page mode. Entries
//! keep their payload as raw [`serde_json::Value`] so each page owns its own
//! payload schema without this module knowing about it. Every mutation writes
//! the whole file back; the store is small enough that this stays cheap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    Chat,
    AiToAi,
    CompareAi,
    Image,
    Video,
}

impl HistoryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryMode::Chat => "chat",
            HistoryMode::AiToAi => "ai_to_ai",
            HistoryMode::CompareAi => "compare_ai",
            HistoryMode::Image => "image",
            HistoryMode::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    chat: Vec<HistoryEntry>,
    #[serde(default)]
    ai_to_ai: Vec<HistoryEntry>,
    #[serde(default)]
    compare_ai: Vec<HistoryEntry>,
    #[serde(default)]
    image: Vec<HistoryEntry>,
    #[serde(default)]
    video: Vec<HistoryEntry>,
}

impl HistoryFile {
    fn list(&self, mode: HistoryMode) -> &Vec<HistoryEntry> {
        match mode {
            HistoryMode::Chat => &self.chat,
            HistoryMode::AiToAi => &self.ai_to_ai,
            HistoryMode::CompareAi => &self.compare_ai,
            HistoryMode::Image => &self.image,
            HistoryMode::Video => &self.video,
        }
    }

    fn list_mut(&mut self, mode: HistoryMode) -> &mut Vec<HistoryEntry> {
        match mode {
            HistoryMode::Chat => &mut self.chat,
            HistoryMode::AiToAi => &mut self.ai_to_ai,
            HistoryMode::CompareAi => &mut self.compare_ai,
            HistoryMode::Image => &mut self.image,
            HistoryMode::Video => &mut self.video,
        }
    }
}

pub struct HistoryStore {
    path: PathBuf,
    file: HistoryFile,
}

impl HistoryStore {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kaleido")
            .join("history.json")
    }

    /// Open the store, starting empty when the file is missing or corrupt.
    pub fn open(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let file = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!("history file corrupt, starting empty: {e}");
                HistoryFile::default()
            }),
            Err(_) => HistoryFile::default(),
        };
        Self { path, file }
    }

    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!("failed to create history dir: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(&self.file) {
            Ok(text) => {
                if let Err(e) = fs::write(&self.path, text) {
                    tracing::warn!("failed to write history: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize history: {e}"),
        }
    }

    pub fn entries(&self, mode: HistoryMode) -> &[HistoryEntry] {
        self.file.list(mode)
    }

    pub fn entry(&self, mode: HistoryMode, id: &str) -> Option<&HistoryEntry> {
        self.file.list(mode).iter().find(|e| e.id == id)
    }

    /// Add a new entry at the front so the list stays newest first.
    pub fn add_entry(
        &mut self,
        mode: HistoryMode,
        name: impl Into<String>,
        data: serde_json::Value,
    ) -> HistoryEntry {
        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            timestamp: Utc::now(),
            data,
        };
        self.file.list_mut(mode).insert(0, entry.clone());
        self.persist();
        entry
    }

    /// Replace an entry's payload and refresh its timestamp. Returns false
    /// when no entry has that id.
    pub fn update_entry_data(
        &mut self,
        mode: HistoryMode,
        id: &str,
        data: serde_json::Value,
    ) -> bool {
        let Some(entry) = self.file.list_mut(mode).iter_mut().find(|e| e.id == id) else {
            return false;
        };
        entry.data = data;
        entry.timestamp = Utc::now();
        self.persist();
        true
    }

    pub fn rename_entry(&mut self, mode: HistoryMode, id: &str, name: &str) -> bool {
        let Some(entry) = self.file.list_mut(mode).iter_mut().find(|e| e.id == id) else {
            return false;
        };
        entry.name = name.to_string();
        self.persist();
        true
    }

    pub fn delete_entry(&mut self, mode: HistoryMode, id: &str) -> bool {
        let list = self.file.list_mut(mode);
        let before = list.len();
        list.retain(|e| e.id != id);
        let removed = list.len() != before;
        if removed {
            self.persist();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = HistoryStore::open(Some(&path));
        (dir, store)
    }

    #[test]
    fn test_round_trip_per_mode() {
        let (dir, mut store) = temp_store();
        store.add_entry(HistoryMode::Chat, "first chat", json!({"messages": []}));
        store.add_entry(HistoryMode::Video, "a storm", json!({"prompt": "storm"}));

        let reopened = HistoryStore::open(Some(&dir.path().join("history.json")));
        assert_eq!(reopened.entries(HistoryMode::Chat).len(), 1);
        assert_eq!(reopened.entries(HistoryMode::Chat)[0].name, "first chat");
        assert_eq!(reopened.entries(HistoryMode::Video).len(), 1);
        assert!(reopened.entries(HistoryMode::AiToAi).is_empty());
    }

    #[test]
    fn test_entries_are_newest_first() {
        let (_dir, mut store) = temp_store();
        store.add_entry(HistoryMode::Chat, "old", json!({}));
        store.add_entry(HistoryMode::Chat, "new", json!({}));
        let names: Vec<&str> = store
            .entries(HistoryMode::Chat)
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["new", "old"]);
    }

    #[test]
    fn test_delete_removes_only_target() {
        let (_dir, mut store) = temp_store();
        let a = store.add_entry(HistoryMode::Chat, "a", json!({}));
        let b = store.add_entry(HistoryMode::Chat, "b", json!({}));
        assert!(store.delete_entry(HistoryMode::Chat, &a.id));
        assert!(!store.delete_entry(HistoryMode::Chat, &a.id));
        assert_eq!(store.entries(HistoryMode::Chat), std::slice::from_ref(&b));
    }

    #[test]
    fn test_rename_and_update() {
        let (_dir, mut store) = temp_store();
        let entry = store.add_entry(HistoryMode::Image, "untitled", json!({"n": 1}));
        assert!(store.rename_entry(HistoryMode::Image, &entry.id, "sunset"));
        assert!(store.update_entry_data(HistoryMode::Image, &entry.id, json!({"n": 2})));
        let stored = store.entry(HistoryMode::Image, &entry.id).unwrap();
        assert_eq!(stored.name, "sunset");
        assert_eq!(stored.data["n"], 2);
        assert!(stored.timestamp >= entry.timestamp);
        assert!(!store.rename_entry(HistoryMode::Image, "missing", "x"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = HistoryStore::open(Some(&path));
        assert!(store.entries(HistoryMode::Chat).is_empty());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(HistoryMode::AiToAi.as_str(), "ai_to_ai");
        assert_eq!(HistoryMode::CompareAi.as_str(), "compare_ai");
    }
}
