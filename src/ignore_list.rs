//! Persisted ignore list.
//!
//! Ignored keys only hide actions and routes from the default views; they
//! never change how an action is classified.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const IGNORE_FILE: &str = ".action-audit-ignore.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IgnoreList {
    pub ignored: BTreeSet<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub version: String,
}

impl Default for IgnoreList {
    fn default() -> Self {
        Self {
            ignored: BTreeSet::new(),
            last_updated: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl IgnoreList {
    pub fn path_for(root: &Path) -> PathBuf {
        root.join(IGNORE_FILE)
    }

    /// Reads the list under `root`; a missing file is an empty list.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path_for(root);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Writes the list under `root`, stamping `lastUpdated` and `version`.
    pub fn save(&mut self, root: &Path, now: DateTime<Utc>) -> Result<()> {
        self.last_updated = Some(now);
        self.version = env!("CARGO_PKG_VERSION").to_string();
        let path = Self::path_for(root);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn is_ignored(&self, key: &str) -> bool {
        self.ignored.contains(key)
    }

    /// Returns how many keys were newly added.
    pub fn ignore<I, S>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        keys.into_iter()
            .map(|k| self.ignored.insert(k.into()))
            .filter(|added| *added)
            .count()
    }

    /// Returns how many keys were removed.
    pub fn unignore<'a, I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter()
            .map(|k| self.ignored.remove(k))
            .filter(|removed| *removed)
            .count()
    }

    /// Items whose key is not ignored, in their original order.
    pub fn available<'a, T>(&self, items: &'a [T], key: impl Fn(&T) -> &str) -> Vec<&'a T> {
        items.iter().filter(|item| !self.is_ignored(key(*item))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_file_is_empty_list() {
        let tmp = tempfile::tempdir().unwrap();
        let list = IgnoreList::load(tmp.path()).unwrap();
        assert!(list.ignored.is_empty());
        assert_eq!(list.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn save_and_load_keep_keys_and_stamp() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

        let mut list = IgnoreList::default();
        assert_eq!(list.ignore(["/api/v1/a", "lib/b", "/api/v1/a"]), 2);
        list.save(tmp.path(), now).unwrap();

        let loaded = IgnoreList::load(tmp.path()).unwrap();
        assert!(loaded.is_ignored("/api/v1/a"));
        assert!(loaded.is_ignored("lib/b"));
        assert_eq!(loaded.last_updated, Some(now));

        let raw: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(IgnoreList::path_for(tmp.path())).unwrap(),
        )
        .unwrap();
        assert!(raw.get("lastUpdated").is_some());
        assert!(raw["ignored"].is_array());
    }

    #[test]
    fn unignore_removes_only_present_keys() {
        let mut list = IgnoreList::default();
        list.ignore(["/api/a"]);
        assert_eq!(list.unignore(["/api/a", "/api/zzz"]), 1);
        assert!(!list.is_ignored("/api/a"));
    }

    #[test]
    fn available_filters_ignored_items() {
        let mut list = IgnoreList::default();
        list.ignore(["b"]);
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let shown = list.available(&items, |s| s.as_str());
        assert_eq!(shown, vec!["a", "c"]);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(IgnoreList::path_for(tmp.path()), "nope").unwrap();
        assert!(IgnoreList::load(tmp.path()).is_err());
    }
}
