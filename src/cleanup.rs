//! Mutations: backup-then-delete and marking declarations.
//!
//! Every batch operation keeps going after a per-item failure and returns a
//! [`BatchReport`] listing what succeeded and what did not.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Top-level field inserted by [`mark_content`].
pub const MARK_FIELD: &str = "_unused";

/// A single failed item in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchError {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of a batch mutation.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<PathBuf>,
    pub backed_up: Vec<PathBuf>,
    pub errors: Vec<BatchError>,
}

impl BatchReport {
    pub fn done(&mut self, path: &Path) {
        self.succeeded.push(path.to_path_buf());
    }

    pub fn fail(&mut self, path: &Path, message: impl Display) {
        warn!(path = %path.display(), "{}", message);
        self.errors.push(BatchError {
            path: path.to_path_buf(),
            message: message.to_string(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Where backups of one batch go.
#[derive(Debug, Clone)]
pub struct BackupDir {
    root: PathBuf,
    dir: PathBuf,
}

impl BackupDir {
    /// `<root>/.action-audit/backups/<timestamp>`, created lazily.
    pub fn new(root: &Path, now: DateTime<Utc>) -> Self {
        let dir = root
            .join(".action-audit")
            .join("backups")
            .join(now.format("%Y%m%dT%H%M%SZ").to_string());
        Self {
            root: root.to_path_buf(),
            dir,
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Copies `file` into the backup tree, mirroring its project-relative path.
    pub fn copy(&self, file: &Path) -> Result<PathBuf> {
        let relative = file.strip_prefix(&self.root).unwrap_or(file);
        let relative: PathBuf = relative
            .components()
            .filter(|c| matches!(c, std::path::Component::Normal(_)))
            .collect();
        if relative.as_os_str().is_empty() {
            bail!("nothing to back up for {}", file.display());
        }

        let target = self.dir.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create backup dir: {}", parent.display()))?;
        }
        fs::copy(file, &target)
            .with_context(|| format!("copy {} to {}", file.display(), target.display()))?;
        Ok(target)
    }
}

/// Deletes each file, backing it up first when `backup` is set.
///
/// A file whose backup fails is not deleted. With `dry_run` nothing is
/// touched and every file is reported as succeeded.
pub fn delete_files(files: &[PathBuf], backup: Option<&BackupDir>, dry_run: bool) -> BatchReport {
    let mut report = BatchReport::default();

    for file in files {
        if dry_run {
            report.done(file);
            continue;
        }

        if let Some(backup) = backup {
            match backup.copy(file) {
                Ok(target) => report.backed_up.push(target),
                Err(err) => {
                    report.fail(file, format!("backup failed, not deleted: {:#}", err));
                    continue;
                }
            }
        }

        match fs::remove_file(file) {
            Ok(()) => {
                debug!(file = %file.display(), "deleted");
                report.done(file);
            }
            Err(err) => report.fail(file, err),
        }
    }

    report
}

/// Inserts a `"_unused"` marker as the first field of a JSON object.
///
/// The rest of the content is kept byte-for-byte. Returns `None` when the
/// object already carries the marker.
pub fn mark_content(content: &str, stamp: DateTime<Utc>) -> Result<Option<String>> {
    let value: serde_json::Value =
        serde_json::from_str(content).context("declaration is not valid JSON")?;
    let Some(map) = value.as_object() else {
        bail!("declaration is not a JSON object");
    };
    if map.contains_key(MARK_FIELD) {
        return Ok(None);
    }

    let Some(open) = content.find('{') else {
        bail!("declaration has no opening brace");
    };
    let marker = serde_json::to_string(&format!(
        "marked by action-audit on {}",
        stamp.format("%Y-%m-%d")
    ))?;
    let separator = if map.is_empty() { "" } else { "," };

    let mut result = String::with_capacity(content.len() + marker.len() + 16);
    result.push_str(&content[..=open]);
    result.push_str(&format!("\n  \"{}\": {}{}", MARK_FIELD, marker, separator));
    if map.is_empty() {
        result.push('\n');
    }
    result.push_str(&content[open + 1..]);
    Ok(Some(result))
}

/// Marks each file in place. Already-marked files count as succeeded.
pub fn mark_files(files: &[PathBuf], stamp: DateTime<Utc>, dry_run: bool) -> BatchReport {
    let mut report = BatchReport::default();

    for file in files {
        let outcome = fs::read_to_string(file)
            .with_context(|| format!("read {}", file.display()))
            .and_then(|content| mark_content(&content, stamp));

        match outcome {
            Ok(Some(marked)) if !dry_run => match fs::write(file, marked) {
                Ok(()) => report.done(file),
                Err(err) => report.fail(file, err),
            },
            Ok(_) => report.done(file),
            Err(err) => report.fail(file, format!("{:#}", err)),
        }
    }

    report
}
