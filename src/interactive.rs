//! Menu-driven review of a scan.
//!
//! One mutation runs at a time. Anything that changes declaration files is
//! followed by a fresh scan so classifications never go stale.

use crate::analyzer::{ActionReport, ScanResult, scan};
use crate::cleanup::{BackupDir, delete_files, mark_files};
use crate::config::AuditConfig;
use crate::empty_dirs::remove_empty_dirs;
use crate::ignore_list::IgnoreList;
use crate::report;
use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use dialoguer::{Confirm, Input, MultiSelect, Select, theme::ColorfulTheme};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_EXPORT: &str = ".action-audit/action-audit-report.json";

/// Flags that shape every mutation in a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub dry_run: bool,
    pub backup: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Review,
    Ignore,
    Unignore,
    Mark,
    Delete,
    Routes,
    EmptyFolders,
    Export,
    Rescan,
    Quit,
}

const MENU: [MenuItem; 10] = [
    MenuItem::Review,
    MenuItem::Ignore,
    MenuItem::Unignore,
    MenuItem::Mark,
    MenuItem::Delete,
    MenuItem::Routes,
    MenuItem::EmptyFolders,
    MenuItem::Export,
    MenuItem::Rescan,
    MenuItem::Quit,
];

impl MenuItem {
    fn label(self) -> &'static str {
        match self {
            MenuItem::Review => "Show report",
            MenuItem::Ignore => "Ignore actions or routes",
            MenuItem::Unignore => "Unignore",
            MenuItem::Mark => "Mark unused actions",
            MenuItem::Delete => "Delete unused actions",
            MenuItem::Routes => "Check routes",
            MenuItem::EmptyFolders => "Remove empty folders",
            MenuItem::Export => "Export JSON report",
            MenuItem::Rescan => "Rescan",
            MenuItem::Quit => "Quit",
        }
    }
}

/// Unused actions that are not on the ignore list, in result order.
pub fn deletable<'a>(result: &'a ScanResult, ignore: &IgnoreList) -> Vec<&'a ActionReport> {
    result
        .unused()
        .filter(|a| !ignore.is_ignored(&a.url_path))
        .collect()
}

/// Keys that may be added to the ignore list: unused actions first, then
/// routes with missing targets.
pub fn ignorable_keys(result: &ScanResult, ignore: &IgnoreList) -> Vec<String> {
    let actions = result.unused().map(|a| a.url_path.clone());
    let routes = result.routes.iter().filter(|r| !r.is_ok()).map(|r| r.key());
    actions
        .chain(routes)
        .filter(|k| !k.is_empty() && !ignore.is_ignored(k))
        .collect()
}

pub struct Session {
    config: AuditConfig,
    options: Options,
    ignore: IgnoreList,
    result: ScanResult,
    theme: ColorfulTheme,
}

impl Session {
    pub fn new(config: &AuditConfig, result: ScanResult, options: Options) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            options,
            ignore: IgnoreList::load(&config.root)?,
            result,
            theme: ColorfulTheme::default(),
        })
    }

    pub fn run(mut self) -> Result<()> {
        if self.options.dry_run {
            println!("{} no files will be changed", "dry-run:".cyan().bold());
        }

        let labels: Vec<&str> = MENU.iter().map(|m| m.label()).collect();
        loop {
            let choice = Select::with_theme(&self.theme)
                .with_prompt("What next?")
                .items(&labels)
                .default(0)
                .interact_opt()?;
            let Some(index) = choice else {
                return Ok(());
            };

            match MENU[index] {
                MenuItem::Review => report::print_scan_result(
                    &self.result,
                    &self.config,
                    &self.ignore,
                    self.options.verbose,
                ),
                MenuItem::Ignore => self.ignore_keys()?,
                MenuItem::Unignore => self.unignore_keys()?,
                MenuItem::Mark => self.mark()?,
                MenuItem::Delete => self.delete()?,
                MenuItem::Routes => report::print_routes(&self.result.routes, &self.ignore),
                MenuItem::EmptyFolders => self.remove_empty()?,
                MenuItem::Export => self.export()?,
                MenuItem::Rescan => self.rescan()?,
                MenuItem::Quit => return Ok(()),
            }
        }
    }

    fn pick(&self, prompt: &str, labels: &[String], checked: bool) -> Result<Vec<usize>> {
        let defaults = vec![checked; labels.len()];
        Ok(MultiSelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(labels)
            .defaults(&defaults)
            .interact()?)
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()?)
    }

    fn rescan(&mut self) -> Result<()> {
        self.result = scan(&self.config)?;
        debug!(actions = self.result.summary.total_actions, "rescanned");
        println!(
            "{} {} actions, {} unused",
            "info:".blue().bold(),
            self.result.summary.total_actions,
            self.result.unused().count()
        );
        Ok(())
    }

    fn save_ignore(&mut self) -> Result<()> {
        if self.options.dry_run {
            return Ok(());
        }
        self.ignore.save(&self.config.root, Utc::now())
    }

    fn ignore_keys(&mut self) -> Result<()> {
        let keys = ignorable_keys(&self.result, &self.ignore);
        if keys.is_empty() {
            println!("{} Nothing left to ignore", "ok:".green().bold());
            return Ok(());
        }
        let picks = self.pick("Ignore which entries?", &keys, false)?;
        let added = self.ignore.ignore(picks.into_iter().map(|i| keys[i].clone()));
        self.save_ignore()?;
        println!("{} {} entry(s) ignored", "ok:".green().bold(), added);
        Ok(())
    }

    fn unignore_keys(&mut self) -> Result<()> {
        let keys: Vec<String> = self.ignore.ignored.iter().cloned().collect();
        if keys.is_empty() {
            println!("{} The ignore list is empty", "ok:".green().bold());
            return Ok(());
        }
        let picks = self.pick("Unignore which entries?", &keys, false)?;
        let removed = self.ignore.unignore(picks.iter().map(|&i| keys[i].as_str()));
        self.save_ignore()?;
        println!("{} {} entry(s) unignored", "ok:".green().bold(), removed);
        Ok(())
    }

    /// Selected unused declaration files, or `None` when nothing was chosen.
    fn pick_unused(&self, prompt: &str) -> Result<Option<Vec<PathBuf>>> {
        let candidates = deletable(&self.result, &self.ignore);
        if candidates.is_empty() {
            println!("{} No unreferenced actions", "ok:".green().bold());
            return Ok(None);
        }
        let labels: Vec<String> = candidates
            .iter()
            .map(|a| format!("{} ({})", a.url_path, a.status))
            .collect();
        let picks = self.pick(prompt, &labels, false)?;
        if picks.is_empty() {
            println!("Nothing selected");
            return Ok(None);
        }
        Ok(Some(
            picks
                .into_iter()
                .map(|i| candidates[i].file_path.clone())
                .collect(),
        ))
    }

    fn mark(&mut self) -> Result<()> {
        let Some(files) = self.pick_unused("Mark which actions?")? else {
            return Ok(());
        };
        let batch = mark_files(&files, Utc::now(), self.options.dry_run);
        report::print_batch("marked", &batch, &self.config, self.options.dry_run);
        if !self.options.dry_run {
            self.rescan()?;
        }
        Ok(())
    }

    fn delete(&mut self) -> Result<()> {
        let Some(files) = self.pick_unused("Delete which actions?")? else {
            return Ok(());
        };
        let prompt = format!("Delete {} file(s)?", files.len());
        if !self.confirm(&prompt)? {
            return Ok(());
        }

        let backup = self
            .options
            .backup
            .then(|| BackupDir::new(&self.config.root, Utc::now()));
        if let Some(dir) = &backup {
            debug!(dir = %dir.path().display(), "backing up before delete");
        }
        let batch = delete_files(&files, backup.as_ref(), self.options.dry_run);
        report::print_batch("deleted", &batch, &self.config, self.options.dry_run);
        if !self.options.dry_run {
            self.rescan()?;
        }
        Ok(())
    }

    fn remove_empty(&mut self) -> Result<()> {
        let folders = &self.result.empty_folders;
        if folders.is_empty() {
            println!("{} No empty folders", "ok:".green().bold());
            return Ok(());
        }
        let labels: Vec<String> = folders
            .iter()
            .map(|f| f.relative_path.display().to_string())
            .collect();
        let picks = self.pick("Remove which folders?", &labels, true)?;
        if picks.is_empty() {
            return Ok(());
        }
        let dirs: Vec<PathBuf> = picks.into_iter().map(|i| folders[i].path.clone()).collect();

        let batch = remove_empty_dirs(&dirs, self.options.dry_run);
        report::print_batch("removed", &batch, &self.config, self.options.dry_run);
        if !self.options.dry_run {
            self.rescan()?;
        }
        Ok(())
    }

    fn export(&mut self) -> Result<()> {
        let target: String = Input::with_theme(&self.theme)
            .with_prompt("Write report to")
            .default(DEFAULT_EXPORT.to_string())
            .interact_text()?;
        let path = self.config.root.join(target);
        report::write_json(&self.result, &path)?;
        self.config.exclude_output(&path);
        println!("{} report written to {}", "ok:".green().bold(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_result() -> ScanResult {
        let config = AuditConfig::new(
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample-project"),
        );
        scan(&config).unwrap()
    }

    #[test]
    fn deletable_skips_ignored_actions() {
        let result = fixture_result();
        let mut ignore = IgnoreList::default();
        let keys: Vec<_> = deletable(&result, &ignore).iter().map(|a| a.url_path.clone()).collect();
        assert_eq!(keys, vec!["/api/v1/courses/orphan", "lib/unused/helper"]);

        ignore.ignore(["lib/unused/helper"]);
        let keys: Vec<_> = deletable(&result, &ignore).iter().map(|a| a.url_path.clone()).collect();
        assert_eq!(keys, vec!["/api/v1/courses/orphan"]);
    }

    #[test]
    fn ignorable_keys_include_broken_routes() {
        let result = fixture_result();
        let mut ignore = IgnoreList::default();
        assert_eq!(
            ignorable_keys(&result, &ignore),
            vec!["/api/v1/courses/orphan", "lib/unused/helper", "/missing", "/stale"]
        );

        ignore.ignore(["/stale", "/api/v1/courses/orphan"]);
        assert_eq!(
            ignorable_keys(&result, &ignore),
            vec!["lib/unused/helper", "/missing"]
        );
    }

    #[test]
    fn default_export_is_not_read_back_by_a_rescan() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for (rel, content) in [
            ("app/api/caller.json", r#"{ "exec": "/api/callee" }"#),
            ("app/api/callee.json", r#"{ "steps": [] }"#),
        ] {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        std::fs::create_dir_all(root.join("app/lib")).unwrap();
        let config = AuditConfig::new(root);

        let before = scan(&config).unwrap();
        report::write_json(&before, &root.join(DEFAULT_EXPORT)).unwrap();
        std::fs::remove_file(root.join("app/api/caller.json")).unwrap();

        let after = scan(&config).unwrap();
        assert!(after.action("/api/callee").unwrap().is_unused());
    }

    #[test]
    fn menu_labels_are_unique() {
        let mut labels: Vec<_> = MENU.iter().map(|m| m.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), MENU.len());
    }
}
