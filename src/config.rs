//! Project layout configuration.
//!
//! Defaults describe the conventional layout. A project can override any
//! part of it with an optional `.action-audit.json` at its root.

use crate::normalize::{API_PREFIX, LIB_PREFIX};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".action-audit.json";

/// Where things live, relative to the project root.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Layout {
    pub api_dir: PathBuf,
    pub lib_dir: PathBuf,
    pub routes_file: PathBuf,
    pub views_dir: PathBuf,
    pub markup_dirs: Vec<PathBuf>,
    pub script_dirs: Vec<PathBuf>,
    /// Extra glob patterns, relative to the project root, to skip.
    pub exclude: Vec<String>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            api_dir: "app/api".into(),
            lib_dir: "app/lib".into(),
            routes_file: "app/config/routes.json".into(),
            views_dir: "views".into(),
            markup_dirs: vec!["views".into(), "public".into()],
            script_dirs: vec!["public".into(), "views".into(), "extensions".into()],
            exclude: Vec::new(),
        }
    }
}

/// Everything a scan needs to know.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub root: PathBuf,
    pub layout: Layout,
    /// Reports written into the project, relative to the root. Never scanned.
    pub outputs: Vec<PathBuf>,
}

impl AuditConfig {
    /// Uses the default layout under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            layout: Layout::default(),
            outputs: Vec::new(),
        }
    }

    /// Reads `.action-audit.json` under `root` if present, then appends
    /// `extra_excludes` from the command line.
    pub fn load(root: impl Into<PathBuf>, extra_excludes: &[String]) -> Result<Self> {
        let root = root.into();
        let path = root.join(CONFIG_FILE);
        let mut layout = if path.is_file() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Layout::default()
        };
        layout.exclude.extend(extra_excludes.iter().cloned());
        Ok(Self {
            root,
            layout,
            outputs: Vec::new(),
        })
    }

    pub fn api_dir(&self) -> PathBuf {
        self.root.join(&self.layout.api_dir)
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.root.join(&self.layout.lib_dir)
    }

    pub fn routes_file(&self) -> PathBuf {
        self.root.join(&self.layout.routes_file)
    }

    pub fn views_dir(&self) -> PathBuf {
        self.root.join(&self.layout.views_dir)
    }

    pub fn markup_dirs(&self) -> Vec<PathBuf> {
        self.layout.markup_dirs.iter().map(|d| self.root.join(d)).collect()
    }

    pub fn script_dirs(&self) -> Vec<PathBuf> {
        self.layout.script_dirs.iter().map(|d| self.root.join(d)).collect()
    }

    /// Declaration file a logical action key lives in, if the key is in one
    /// of the two namespaces.
    pub fn declaration_path(&self, key: &str) -> Option<PathBuf> {
        let (dir, rest) = if let Some(rest) = key.strip_prefix(API_PREFIX) {
            (self.api_dir(), rest)
        } else if let Some(rest) = key.strip_prefix(LIB_PREFIX) {
            (self.lib_dir(), rest)
        } else {
            return None;
        };
        Some(dir.join(format!("{}.json", rest)))
    }

    /// Keeps a report written to `path` out of later scans. Paths outside
    /// the project root are ignored.
    pub fn exclude_output(&mut self, path: &Path) {
        let (Ok(path), Ok(root)) = (std::path::absolute(path), std::path::absolute(&self.root))
        else {
            return;
        };
        if let Ok(relative) = path.strip_prefix(&root)
            && !self.outputs.iter().any(|o| o == relative)
        {
            self.outputs.push(relative.to_path_buf());
        }
    }

    /// `path` relative to the project root, for display and backups.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_conventional_tree() {
        let config = AuditConfig::new("/project");
        assert_eq!(config.api_dir(), PathBuf::from("/project/app/api"));
        assert_eq!(config.lib_dir(), PathBuf::from("/project/app/lib"));
        assert_eq!(
            config.routes_file(),
            PathBuf::from("/project/app/config/routes.json")
        );
        assert_eq!(config.markup_dirs().len(), 2);
        assert_eq!(config.script_dirs().len(), 3);
    }

    #[test]
    fn load_without_file_uses_defaults_plus_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let config = AuditConfig::load(dir.path(), &["public/vendor/**".to_string()]).unwrap();
        assert_eq!(config.layout.api_dir, PathBuf::from("app/api"));
        assert_eq!(config.layout.exclude, vec!["public/vendor/**"]);
    }

    #[test]
    fn load_merges_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "scriptDirs": ["assets/js"], "exclude": ["views/legacy/**"] }"#,
        )
        .unwrap();
        let config = AuditConfig::load(dir.path(), &["x/**".to_string()]).unwrap();
        assert_eq!(config.layout.script_dirs, vec![PathBuf::from("assets/js")]);
        assert_eq!(config.layout.lib_dir, PathBuf::from("app/lib"));
        assert_eq!(config.layout.exclude, vec!["views/legacy/**", "x/**"]);
    }

    #[test]
    fn load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ nope").unwrap();
        let err = AuditConfig::load(dir.path(), &[]).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn declaration_path_for_api_and_lib_keys() {
        let config = AuditConfig::new("/p");
        assert_eq!(
            config.declaration_path("/api/v1/a"),
            Some(PathBuf::from("/p/app/api/v1/a.json"))
        );
        assert_eq!(
            config.declaration_path("lib/sec/check"),
            Some(PathBuf::from("/p/app/lib/sec/check.json"))
        );
        assert_eq!(config.declaration_path("index"), None);
    }

    #[test]
    fn exclude_output_keeps_paths_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AuditConfig::new(dir.path());
        config.exclude_output(&dir.path().join("reports/audit.json"));
        config.exclude_output(&dir.path().join("reports/audit.json"));
        config.exclude_output(Path::new("/elsewhere/audit.json"));
        assert_eq!(config.outputs, vec![PathBuf::from("reports/audit.json")]);
    }

    #[test]
    fn relative_strips_root() {
        let config = AuditConfig::new("/project");
        assert_eq!(
            config.relative(Path::new("/project/app/api/a.json")),
            Path::new("app/api/a.json")
        );
        assert_eq!(config.relative(Path::new("/elsewhere")), Path::new("/elsewhere"));
    }
}
