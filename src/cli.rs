//! Command-line interface definitions.
//!
//! Global flags apply to every subcommand. Running without a subcommand is the
//! same as `audit`.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Find unreferenced server actions and routes in JSON-declared web projects.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct GlobalOpts {
    /// Project root containing `app/`, `views/` and `public/`.
    #[arg(long, global = true, default_value = ".")]
    pub project_root: PathBuf,

    /// Print the report and exit without prompting.
    #[arg(long, global = true)]
    pub non_interactive: bool,

    /// Report what would change without touching any file.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Write the scan result as JSON to this file.
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Emit JSON on stdout instead of the human-readable report.
    #[arg(long, global = true)]
    pub json: bool,

    /// Glob patterns, relative to the project root, to leave out of the scan
    /// (e.g., "public/vendor/**"). Hidden entries and `node_modules` are
    /// always skipped.
    #[arg(short, long, global = true)]
    pub exclude: Vec<String>,

    /// Delete without copying files to `.action-audit/backups` first.
    #[arg(long, global = true)]
    pub no_backup: bool,

    /// Print per-reference detail and debug logs.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Commands {
    /// Scan, report, and review unreferenced actions interactively.
    Audit,

    /// Check every route's page, layout and exec target.
    Routes,

    /// List the files that would be searched for references.
    Files,

    /// List empty folders under the action trees, optionally removing them.
    Empty {
        /// Remove the folders found (respects --dry-run).
        #[arg(long)]
        remove: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_audit() {
        let args = Args::parse_from(["action-audit", "--dry-run"]);
        assert!(args.command.is_none());
        assert!(args.global.dry_run);
        assert_eq!(args.global.project_root, PathBuf::from("."));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::parse_from([
            "action-audit",
            "empty",
            "--remove",
            "--project-root",
            "/srv/app",
            "-e",
            "public/vendor/**",
            "-e",
            "views/legacy/**",
        ]);
        assert!(matches!(args.command, Some(Commands::Empty { remove: true })));
        assert_eq!(args.global.project_root, PathBuf::from("/srv/app"));
        assert_eq!(args.global.exclude.len(), 2);
    }
}
