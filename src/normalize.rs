//! Path normalization.
//!
//! Turns a raw path-like string pulled out of some file into the logical key
//! the [`ActionIndex`](crate::index::ActionIndex) is keyed by. API actions are
//! keyed `/api/...`, library actions `lib/...`, both without the `.json`
//! extension.
//!
//! The rules are a static heuristic. Strings that merely contain `/api/` can
//! over-match, and paths assembled at runtime are never seen at all.

use std::path::{Component, Path};

pub const API_PREFIX: &str = "/api/";
pub const LIB_PREFIX: &str = "lib/";

const INTERNAL_API_PREFIX: &str = "/app/api/";
const INTERNAL_LIB_PREFIX: &str = "/app/lib/";
const JSON_EXT: &str = ".json";

/// What kind of entity a raw string is being resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Action,
    Route,
}

/// Normalizes `raw` into a logical key, or `None` if it cannot be a reference.
///
/// For [`EntityKind::Action`] the first matching rule wins:
/// 1. `/api/...` passes through.
/// 2. `/app/api/...` and `/app/lib/...` drop the internal `/app` root.
/// 3. A bare relative identifier gets the `lib/` namespace.
///
/// A trailing `.json` is then stripped. Anything else (absolute non-API paths,
/// URLs with a scheme) yields `None` and never reaches the action index.
///
/// For [`EntityKind::Route`] the trimmed string is returned as-is so route
/// checks can resolve page templates themselves.
pub fn normalize(raw: &str, kind: EntityKind) -> Option<String> {
    let trimmed = strip_query(raw.trim());
    if trimmed.is_empty() {
        return None;
    }

    if kind == EntityKind::Route {
        return Some(trimmed.to_string());
    }

    let key = if trimmed.starts_with(API_PREFIX) {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix(INTERNAL_API_PREFIX) {
        format!("{}{}", API_PREFIX, rest)
    } else if let Some(rest) = trimmed.strip_prefix(INTERNAL_LIB_PREFIX) {
        format!("{}{}", LIB_PREFIX, rest)
    } else if is_bare_identifier(trimmed) {
        if trimmed.starts_with(LIB_PREFIX) {
            trimmed.to_string()
        } else {
            format!("{}{}", LIB_PREFIX, trimmed)
        }
    } else {
        return None;
    };

    let key = key.strip_suffix(JSON_EXT).unwrap_or(&key);
    // `/api/` or `lib/` alone names nothing.
    if key.len() <= LIB_PREFIX.len() || key.ends_with('/') {
        return None;
    }
    Some(key.to_string())
}

/// Cuts a query string or fragment off a path.
pub fn strip_query(s: &str) -> &str {
    match s.find(['?', '#']) {
        Some(i) => &s[..i],
        None => s,
    }
}

fn is_bare_identifier(s: &str) -> bool {
    !s.starts_with('/')
        && !s.starts_with('.')
        && !s.contains("://")
        && !s.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>'))
}

/// Derives the logical key of a declaration file under `tree_root`.
///
/// `namespace` is [`API_PREFIX`] or [`LIB_PREFIX`], so with the conventional
/// layout `app/api/v1/users/list.json` becomes `/api/v1/users/list` and
/// `app/lib/security/check.json` becomes `lib/security/check`.
pub fn action_key_for_file(tree_root: &Path, namespace: &str, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(tree_root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Option<_>>()?;

    let joined = parts.join("/");
    let stem = joined.strip_suffix(JSON_EXT)?;
    if stem.is_empty() {
        return None;
    }
    Some(format!("{}{}", namespace, stem))
}

/// Final path segment of a key, used for near-miss hints.
pub fn leaf(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
