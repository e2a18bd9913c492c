//! Empty directory detection and removal.
//!
//! A directory is empty when it holds no files at any depth. Directories that
//! only contain other empty directories are reported along with them.

use crate::cleanup::BatchReport;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Returns every empty directory strictly below each root, parents before
/// children. Missing roots are skipped.
pub fn find_empty_dirs(roots: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for root in roots.iter().filter(|r| r.is_dir()) {
        let mut below = Vec::new();
        for sub in sorted_subdirs(root)? {
            collect_empty(&sub, &mut below)?;
        }
        found.extend(below);
    }
    Ok(found)
}

/// Post-order walk. Returns whether `dir` is empty; pushes it (before its
/// empty children) onto `out` when it is.
fn collect_empty(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<bool> {
    let mut children = Vec::new();
    let mut empty = true;

    for entry in sorted_entries(dir)? {
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            empty &= collect_empty(&entry.path(), &mut children)?;
        } else {
            empty = false;
        }
    }

    if empty {
        out.push(dir.to_path_buf());
    }
    out.extend(children);
    Ok(empty)
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<fs::DirEntry>> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

fn sorted_subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in sorted_entries(dir)? {
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

/// Whether `dir` currently holds no files at any depth.
pub fn is_empty_tree(dir: &Path) -> io::Result<bool> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() || !is_empty_tree(&entry.path())? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Removes the given directories, deepest first.
///
/// Each directory is re-checked just before removal and only removed with
/// `remove_dir`, so a directory that gained a file, or still has a child that
/// was not listed, fails instead of losing data. Failures are collected.
pub fn remove_empty_dirs(dirs: &[PathBuf], dry_run: bool) -> BatchReport {
    let mut ordered: Vec<&PathBuf> = dirs.iter().collect();
    ordered.sort_by_key(|d| std::cmp::Reverse(d.components().count()));

    let mut report = BatchReport::default();
    for dir in ordered {
        match is_empty_tree(dir) {
            Ok(true) => {}
            Ok(false) => {
                report.fail(dir, "no longer empty");
                continue;
            }
            Err(err) => {
                report.fail(dir, err);
                continue;
            }
        }

        if dry_run {
            report.done(dir);
            continue;
        }
        match fs::remove_dir(dir) {
            Ok(()) => {
                debug!(dir = %dir.display(), "removed empty directory");
                report.done(dir);
            }
            Err(err) => report.fail(dir, err),
        }
    }
    report
}
