//! Action index.
//!
//! Maps logical keys to declared actions and accumulates the references found
//! for each. References that resolve to no known action are kept in a
//! separate map for diagnostics only.

use crate::extractor::Provenance;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

/// One citation of an action found somewhere in the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// File the citation was found in.
    pub file: PathBuf,
    #[serde(rename = "type")]
    pub provenance: Provenance,
    /// The string as it appeared, before normalization.
    pub original: String,
}

/// Two-tier deletion confidence, derived from the reference count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Confidence {
    SafeToDelete,
    ReviewNeeded,
}

impl Confidence {
    pub fn for_count(count: usize) -> Self {
        if count == 0 {
            Confidence::SafeToDelete
        } else {
            Confidence::ReviewNeeded
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::SafeToDelete => "safe-to-delete",
            Confidence::ReviewNeeded => "review-needed",
        })
    }
}

/// A declared server action.
#[derive(Debug, Clone)]
pub struct Action {
    pub key: String,
    pub file: PathBuf,
    pub content: Value,
    pub references: Vec<Reference>,
}

impl Action {
    pub fn new(key: String, file: PathBuf, content: Value) -> Self {
        Self {
            key,
            file,
            content,
            references: Vec::new(),
        }
    }

    /// Only declarations with an `exec` or `steps` field are actions.
    pub fn is_declaration(content: &Value) -> bool {
        content
            .as_object()
            .is_some_and(|m| m.contains_key("exec") || m.contains_key("steps"))
    }

    pub fn confidence(&self) -> Confidence {
        Confidence::for_count(self.references.len())
    }
}

/// Actions in discovery order, with a key lookup.
#[derive(Debug, Default)]
pub struct ActionIndex {
    actions: Vec<Action>,
    by_key: HashMap<String, usize>,
    unresolved: BTreeMap<String, Vec<Reference>>,
}

impl ActionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action. A second declaration of the same key is ignored and
    /// `false` is returned.
    pub fn insert(&mut self, action: Action) -> bool {
        if self.by_key.contains_key(&action.key) {
            return false;
        }
        self.by_key.insert(action.key.clone(), self.actions.len());
        self.actions.push(action);
        true
    }

    pub fn get(&self, key: &str) -> Option<&Action> {
        self.by_key.get(key).map(|&i| &self.actions[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn unresolved(&self) -> &BTreeMap<String, Vec<Reference>> {
        &self.unresolved
    }

    /// Records a reference under `key`.
    ///
    /// Returns `true` when `key` names a known action. Exact duplicates are
    /// dropped.
    pub fn record(&mut self, key: &str, reference: Reference) -> bool {
        let Some(&i) = self.by_key.get(key) else {
            let bucket = self.unresolved.entry(key.to_string()).or_default();
            if !bucket.contains(&reference) {
                bucket.push(reference);
            }
            return false;
        };

        let action = &mut self.actions[i];
        if !action.references.contains(&reference) {
            action.references.push(reference);
        }
        true
    }

    /// Unresolved keys sharing the final path segment of `key`.
    pub fn near_misses(&self, key: &str) -> Vec<&str> {
        let leaf = crate::normalize::leaf(key);
        let suffix = format!("/{}", leaf);
        self.unresolved
            .keys()
            .filter(|k| k.as_str() != key && (k.ends_with(&suffix) || k.as_str() == leaf))
            .map(|k| k.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action(key: &str, file: &str) -> Action {
        Action::new(key.to_string(), PathBuf::from(file), json!({ "steps": [] }))
    }

    fn reference(file: &str, original: &str) -> Reference {
        Reference {
            file: PathBuf::from(file),
            provenance: Provenance::MarkupUrlAttribute,
            original: original.to_string(),
        }
    }

    #[test]
    fn declaration_gate_requires_exec_or_steps() {
        assert!(Action::is_declaration(&json!({ "exec": {} })));
        assert!(Action::is_declaration(&json!({ "steps": [] })));
        assert!(!Action::is_declaration(&json!({ "meta": {} })));
        assert!(!Action::is_declaration(&json!(["exec"])));
    }

    #[test]
    fn confidence_follows_reference_count() {
        let mut index = ActionIndex::new();
        index.insert(action("/api/a", "app/api/a.json"));
        index.insert(action("/api/b", "app/api/b.json"));
        index.record("/api/b", reference("views/b.ejs", "/api/b"));

        assert_eq!(index.get("/api/a").unwrap().confidence(), Confidence::SafeToDelete);
        assert_eq!(index.get("/api/b").unwrap().confidence(), Confidence::ReviewNeeded);
    }

    #[test]
    fn unknown_keys_go_to_unresolved() {
        let mut index = ActionIndex::new();
        index.insert(action("/api/a", "app/api/a.json"));
        assert!(!index.record("/api/missing", reference("views/x.ejs", "/api/missing")));
        assert_eq!(index.unresolved().len(), 1);
        assert!(index.get("/api/a").unwrap().references.is_empty());
    }

    #[test]
    fn exact_duplicates_are_dropped() {
        let mut index = ActionIndex::new();
        index.insert(action("/api/a", "app/api/a.json"));
        index.record("/api/a", reference("views/x.ejs", "/api/a"));
        index.record("/api/a", reference("views/x.ejs", "/api/a"));
        assert_eq!(index.get("/api/a").unwrap().references.len(), 1);
    }

    #[test]
    fn citation_from_own_declaration_counts() {
        let mut index = ActionIndex::new();
        index.insert(action("/api/a", "app/api/a.json"));
        assert!(index.record("/api/a", reference("app/api/a.json", "/api/a")));

        let action = index.get("/api/a").unwrap();
        assert_eq!(action.references.len(), 1);
        assert_eq!(action.confidence(), Confidence::ReviewNeeded);
    }

    #[test]
    fn duplicate_declaration_keeps_first() {
        let mut index = ActionIndex::new();
        assert!(index.insert(action("/api/a", "app/api/a.json")));
        assert!(!index.insert(action("/api/a", "other/a.json")));
        assert_eq!(index.get("/api/a").unwrap().file, PathBuf::from("app/api/a.json"));
    }

    #[test]
    fn near_misses_match_on_leaf() {
        let mut index = ActionIndex::new();
        index.insert(action("/api/v1/users/list", "app/api/v1/users/list.json"));
        index.record("/api/v2/users/list", reference("views/u.ejs", "/api/v2/users/list"));
        index.record("/api/v2/users/listing", reference("views/u.ejs", "/api/v2/users/listing"));
        assert_eq!(index.near_misses("/api/v1/users/list"), vec!["/api/v2/users/list"]);
    }
}
