//! Human-readable and JSON rendering of scan output.

use crate::analyzer::{ActionReport, ActionStatus, EmptyFolder, ScanResult};
use crate::cleanup::BatchReport;
use crate::config::AuditConfig;
use crate::ignore_list::IgnoreList;
use crate::routes::RouteReport;
use crate::scanner::CandidateFiles;
use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use std::path::Path;

/// Pretty-printed scan result JSON.
pub fn to_json(result: &ScanResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Writes the scan result JSON to `path`, creating missing parent folders.
pub fn write_json(result: &ScanResult, path: &Path) -> Result<()> {
    let json = to_json(result)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json + "\n")
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

fn status_label(status: ActionStatus) -> ColoredString {
    match status {
        ActionStatus::Used => "used".green(),
        ActionStatus::PossiblyUnused => "possibly unused".yellow(),
        ActionStatus::LikelyUnused => "likely unused".red(),
    }
}

pub fn print_scan_result(
    result: &ScanResult,
    config: &AuditConfig,
    ignore: &IgnoreList,
    verbose: bool,
) {
    let s = &result.summary;
    let d = &result.diagnostics;

    if verbose {
        println!(
            "\n{} Files: {}, Refs: {} ({} resolved, {} unresolved), Skipped: {}",
            "Diagnostics:".bold(),
            d.files_scanned,
            d.total_refs,
            d.resolved_refs,
            d.unresolved_refs,
            d.skipped_files.len()
        );
    }

    println!(
        "\n{} {} actions: {} used, {} possibly unused, {} likely unused",
        "Summary:".bold(),
        s.total_actions,
        s.used.to_string().green(),
        s.possibly_unused.to_string().yellow(),
        s.likely_unused.to_string().red()
    );

    let unused: Vec<&ActionReport> = result.unused().collect();
    let visible = ignore.available(&unused, |a| a.url_path.as_str());
    let hidden = unused.len() - visible.len();

    if visible.is_empty() {
        println!("{} No unreferenced actions found", "ok:".green().bold());
    } else {
        println!(
            "\n{} {} unreferenced action(s):\n",
            "Found".red().bold(),
            visible.len()
        );
        for action in &visible {
            print_action(action, config, verbose);
        }
    }
    if hidden > 0 {
        println!("  {}", format!("({} ignored)", hidden).dimmed());
    }

    if verbose {
        let used: Vec<&ActionReport> = result.actions.iter().filter(|a| !a.is_unused()).collect();
        if !used.is_empty() {
            println!("\n{} {} referenced action(s):\n", "Used".green().bold(), used.len());
            for action in used {
                print_action(action, config, verbose);
            }
        }
    }

    let broken_routes = result.routes.iter().filter(|r| !r.is_ok()).count();
    if broken_routes > 0 {
        println!(
            "\n{} {} route(s) point at missing targets (see `routes`)",
            "warn:".yellow().bold(),
            broken_routes
        );
    }
    if !result.empty_folders.is_empty() {
        println!(
            "{} {} empty folder(s) under the action trees (see `empty`)",
            "info:".blue().bold(),
            result.empty_folders.len()
        );
    }
}

fn print_action(action: &ActionReport, config: &AuditConfig, verbose: bool) {
    println!(
        "  {} {} {}",
        action.url_path,
        status_label(action.status),
        config.relative(&action.file_path).display().to_string().dimmed()
    );
    if !action.near_misses.is_empty() {
        println!(
            "    {} {}",
            "similar unresolved:".yellow(),
            action.near_misses.join(", ")
        );
    }
    if verbose {
        for reference in &action.references {
            println!(
                "    {} {} {}",
                "<-".green(),
                config.relative(&reference.file).display(),
                format!("({}: {})", reference.provenance, reference.original).dimmed()
            );
        }
    }
}

pub fn print_routes(routes: &[RouteReport], ignore: &IgnoreList) {
    let visible = ignore.available(routes, |r| r.route.path.as_deref().unwrap_or(""));
    if visible.is_empty() {
        println!("{} No routes to check", "ok:".green().bold());
        return;
    }

    let broken = visible.iter().filter(|r| !r.is_ok()).count();
    for report in &visible {
        let path = report.route.path.as_deref().unwrap_or("<no path>");
        if report.is_ok() {
            println!("  {} {}", "ok".green(), path);
        } else {
            println!(
                "  {} {} {}",
                "missing".red(),
                path,
                format!("({})", report.missing.join(", ")).dimmed()
            );
        }
    }

    if broken == 0 {
        println!("\n{} All {} route(s) resolve", "ok:".green().bold(), visible.len());
    } else {
        println!(
            "\n{} {} of {} route(s) point at missing targets",
            "Found".red().bold(),
            broken,
            visible.len()
        );
    }
}

pub fn print_candidates(files: &CandidateFiles, config: &AuditConfig) {
    for (label, set) in [
        ("markup", &files.markup),
        ("structured", &files.structured),
        ("script", &files.script),
    ] {
        println!("{} ({})", label.bold(), set.len());
        for file in set {
            println!("  {}", config.relative(file).display());
        }
    }
    println!("\n{} {} files total", "info:".blue().bold(), files.len());
}

pub fn print_empty_folders(folders: &[EmptyFolder]) {
    if folders.is_empty() {
        println!("{} No empty folders", "ok:".green().bold());
        return;
    }
    println!("{} {} empty folder(s):\n", "Found".yellow().bold(), folders.len());
    for folder in folders {
        println!("  {}", folder.relative_path.display());
    }
}

/// Summarizes a finished batch. `verb` is the past tense of the operation.
pub fn print_batch(verb: &str, report: &BatchReport, config: &AuditConfig, dry_run: bool) {
    let prefix = if dry_run {
        "dry-run:".cyan().bold()
    } else {
        "ok:".green().bold()
    };
    let would = if dry_run { "would be " } else { "" };
    println!("{} {} item(s) {}{}", prefix, report.succeeded.len(), would, verb);

    if let Some(first) = report.backed_up.first() {
        println!(
            "  {} {} file(s), e.g. {}",
            "backed up".dimmed(),
            report.backed_up.len(),
            first.display()
        );
    }

    for error in &report.errors {
        println!(
            "  {} {} {}",
            "error:".red().bold(),
            config.relative(&error.path).display(),
            error.message.dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::scan;
    use std::path::PathBuf;

    fn fixture_config() -> AuditConfig {
        AuditConfig::new(
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample-project"),
        )
    }

    #[test]
    fn json_uses_camel_case_and_kebab_enums() {
        let result = scan(&fixture_config()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&to_json(&result).unwrap()).unwrap();

        assert_eq!(value["summary"]["totalActions"], 9);
        assert_eq!(value["summary"]["likelyUnused"], 2);
        let first = &value["actions"][0];
        assert_eq!(first["urlPath"], "/api/v1/courses/orphan");
        assert_eq!(first["status"], "likely-unused");
        assert_eq!(first["confidence"], "safe-to-delete");
        assert_eq!(first["referenceCount"], 0);
        assert!(first.get("nearMisses").is_none());
        assert!(value["emptyFolders"].is_array());
        assert!(value.get("unresolved").is_none());
    }

    #[test]
    fn references_serialize_with_type_field() {
        let result = scan(&fixture_config()).unwrap();
        let value = serde_json::to_value(result.action("/api/v1/queues/integrations/sync")).unwrap();
        assert_eq!(value["references"][0]["type"], "queue-file-field");
        assert_eq!(
            value["references"][0]["original"],
            "/app/api/v1/queues/integrations/sync.json"
        );
    }

    #[test]
    fn write_json_creates_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested/report.json");
        let result = scan(&fixture_config()).unwrap();
        write_json(&result, &out).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.ends_with("}\n"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["summary"]["used"], 7);
    }
}
