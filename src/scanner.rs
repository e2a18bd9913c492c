//! Candidate file discovery.
//!
//! Walks the project tree in file-name order, skipping hidden entries,
//! `node_modules`, and anything matching a configured exclude glob. The
//! declaration trees are required and any walk error there is fatal; the
//! candidate sets only warn about unreadable entries.

use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::extractor::FileCategory;
use glob::Pattern;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// The three disjoint file sets fed to the extractor.
#[derive(Debug, Default, Serialize)]
pub struct CandidateFiles {
    pub markup: Vec<PathBuf>,
    pub structured: Vec<PathBuf>,
    pub script: Vec<PathBuf>,
}

impl CandidateFiles {
    pub fn len(&self) -> usize {
        self.markup.len() + self.structured.len() + self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every file tagged with its extraction strategy.
    pub fn iter(&self) -> impl Iterator<Item = (FileCategory, &Path)> {
        tagged(FileCategory::Markup, &self.markup)
            .chain(tagged(FileCategory::Structured, &self.structured))
            .chain(tagged(FileCategory::Script, &self.script))
    }
}

fn tagged(category: FileCategory, files: &[PathBuf]) -> impl Iterator<Item = (FileCategory, &Path)> {
    files.iter().map(move |p| (category, p.as_path()))
}

/// Compiled exclusion rules relative to a project root.
#[derive(Debug, Clone)]
pub struct Excludes {
    root: PathBuf,
    patterns: Vec<Pattern>,
    files: Vec<PathBuf>,
}

impl Excludes {
    pub fn new(root: &Path, globs: &[String]) -> Result<Self> {
        let patterns = globs
            .iter()
            .map(|g| {
                Pattern::new(g).map_err(|source| AuditError::BadPattern {
                    pattern: g.clone(),
                    source,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self {
            root: root.to_path_buf(),
            patterns,
            files: Vec::new(),
        })
    }

    /// The configured globs plus every report the tool wrote into the root.
    pub fn for_config(config: &AuditConfig) -> Result<Self> {
        let mut excludes = Self::new(&config.root, &config.layout.exclude)?;
        excludes.files = config.outputs.clone();
        Ok(excludes)
    }

    fn is_excluded(&self, entry: &walkdir::DirEntry) -> bool {
        if entry.depth() > 0 && is_hidden_or_vendored(entry) {
            return true;
        }
        let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
        if self.files.iter().any(|f| f == relative) {
            return true;
        }
        self.patterns.iter().any(|p| {
            p.matches_path(relative) || entry.file_name().to_str().is_some_and(|n| p.matches(n))
        })
    }
}

fn is_hidden_or_vendored(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.') || s == "node_modules")
}

/// Collects every `.json` file under a required declaration root.
///
/// A missing root is reported as [`AuditError::MissingRoot`]; any error while
/// walking it is [`AuditError::DiscoveryIo`].
pub fn collect_declaration_files(
    dir: &Path,
    what: &'static str,
    excludes: &Excludes,
) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AuditError::MissingRoot {
            what,
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !excludes.is_excluded(e))
    {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            AuditError::DiscoveryIo {
                what,
                path,
                source: err.into(),
            }
        })?;
        if entry.file_type().is_file()
            && FileCategory::classify(entry.path()) == Some(FileCategory::Structured)
        {
            files.push(entry.into_path());
        }
    }

    debug!(what, dir = %dir.display(), count = files.len(), "collected declarations");
    Ok(files)
}

/// Collects files of `category` under each of `dirs`, in order, without
/// duplicates. Missing directories are skipped.
pub fn collect_files(dirs: &[PathBuf], category: FileCategory, excludes: &Excludes) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for dir in dirs.iter().filter(|d| d.is_dir()) {
        for entry in WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !excludes.is_excluded(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if entry.file_type().is_file()
                && FileCategory::classify(entry.path()) == Some(category)
                && seen.insert(entry.path().to_path_buf())
            {
                files.push(entry.into_path());
            }
        }
    }

    files
}

/// Gathers the markup, project-wide structured, and script file sets.
pub fn collect_candidates(config: &AuditConfig, excludes: &Excludes) -> CandidateFiles {
    CandidateFiles {
        markup: collect_files(&config.markup_dirs(), FileCategory::Markup, excludes),
        structured: collect_files(
            std::slice::from_ref(&config.root),
            FileCategory::Structured,
            excludes,
        ),
        script: collect_files(&config.script_dirs(), FileCategory::Script, excludes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample-project")
    }

    fn names(files: &[PathBuf], root: &Path) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn collects_declarations_in_name_order() {
        let root = fixture_root();
        let excludes = Excludes::new(&root, &[]).unwrap();
        let files = collect_declaration_files(&root.join("app/api"), "api", &excludes).unwrap();
        assert_eq!(
            names(&files, &root),
            vec![
                "app/api/v1/broken.json",
                "app/api/v1/courses/create.json",
                "app/api/v1/courses/list.json",
                "app/api/v1/courses/orphan.json",
                "app/api/v1/courses/update.json",
                "app/api/v1/mail/send.json",
                "app/api/v1/notes.json",
                "app/api/v1/queues/integrations/sync.json",
                "app/api/v1/security/magic-login.json",
            ]
        );
    }

    #[test]
    fn missing_declaration_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let excludes = Excludes::new(dir.path(), &[]).unwrap();
        let err = collect_declaration_files(&dir.path().join("app/api"), "api", &excludes)
            .unwrap_err();
        assert!(matches!(err, AuditError::MissingRoot { what: "api", .. }));
    }

    #[test]
    fn candidate_sets_are_disjoint_by_extension() {
        let root = fixture_root();
        let config = AuditConfig::new(&root);
        let excludes = Excludes::new(&root, &[]).unwrap();
        let files = collect_candidates(&config, &excludes);

        for (category, file) in files.iter() {
            assert_eq!(FileCategory::classify(file), Some(category));
        }
        assert_eq!(names(&files.script, &root), vec!["public/js/app.js"]);
        assert!(files.structured.contains(&root.join("app/config/routes.json")));
    }

    #[test]
    fn skips_hidden_node_modules_and_globs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "public/js/app.js",
            "public/js/.cache/x.js",
            "public/node_modules/lib/index.js",
            "public/vendor/jquery.js",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        let excludes = Excludes::new(root, &["public/vendor/*".to_string()]).unwrap();
        let files = collect_files(&[root.join("public")], FileCategory::Script, &excludes);
        assert_eq!(names(&files, root), vec!["public/js/app.js"]);
    }

    #[test]
    fn written_reports_are_not_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in ["app/config/routes.json", "audit.json"] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "{}").unwrap();
        }
        let mut config = AuditConfig::new(root);
        config.exclude_output(&root.join("audit.json"));
        let excludes = Excludes::for_config(&config).unwrap();
        let files = collect_candidates(&config, &excludes);
        assert_eq!(names(&files.structured, root), vec!["app/config/routes.json"]);
    }

    #[test]
    fn bad_glob_is_reported() {
        let err = Excludes::new(Path::new("."), &["[".to_string()]).unwrap_err();
        assert!(matches!(err, AuditError::BadPattern { .. }));
    }

    #[test]
    fn iter_tags_each_set() {
        let files = CandidateFiles {
            markup: vec!["a.ejs".into()],
            structured: vec!["b.json".into()],
            script: vec!["c.js".into()],
        };
        let tags: Vec<_> = files.iter().map(|(c, _)| c).collect();
        assert_eq!(
            tags,
            vec![FileCategory::Markup, FileCategory::Structured, FileCategory::Script]
        );
        assert_eq!(files.len(), 3);
    }
}
