//! action-audit: find unreferenced server actions and routes.
//!
//! Scans a project's JSON action declarations, cross-references them against
//! markup, JSON and script files, and offers a review workflow to ignore,
//! mark or delete what nothing points at.

use action_audit::cli::{Args, Commands, GlobalOpts};
use action_audit::interactive::{self, Session};
use action_audit::scanner::{self, Excludes};
use action_audit::{AuditConfig, IgnoreList, analyzer, empty_dirs, report, routes};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.global.verbose);

    let opts = args.global;
    let mut config = AuditConfig::load(&opts.project_root, &opts.exclude)
        .context("Failed to load project configuration")?;
    if let Some(path) = &opts.output {
        config.exclude_output(path);
    }

    match args.command.unwrap_or(Commands::Audit) {
        Commands::Audit => cmd_audit(&config, &opts),
        Commands::Routes => cmd_routes(&config, &opts),
        Commands::Files => cmd_files(&config, &opts),
        Commands::Empty { remove } => cmd_empty(&config, &opts, remove),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_audit(config: &AuditConfig, opts: &GlobalOpts) -> Result<()> {
    let result = analyzer::scan(config)
        .with_context(|| format!("Scan of {} failed", config.root.display()))?;

    if let Some(path) = &opts.output {
        report::write_json(&result, path)?;
        eprintln!("Report written to {}", path.display());
    }

    if opts.json {
        println!("{}", report::to_json(&result)?);
        return Ok(());
    }

    let ignore = IgnoreList::load(&config.root)?;
    report::print_scan_result(&result, config, &ignore, opts.verbose);

    if opts.non_interactive || !std::io::stdin().is_terminal() {
        return Ok(());
    }

    let options = interactive::Options {
        dry_run: opts.dry_run,
        backup: !opts.no_backup,
        verbose: opts.verbose,
    };
    Session::new(config, result, options)?.run()
}

fn cmd_routes(config: &AuditConfig, opts: &GlobalOpts) -> Result<()> {
    let table = routes::load_routes(config)
        .with_context(|| format!("Failed to parse {}", config.routes_file().display()))?;
    let reports = routes::check_routes(config, &table);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        let ignore = IgnoreList::load(&config.root)?;
        report::print_routes(&reports, &ignore);
    }
    Ok(())
}

fn cmd_files(config: &AuditConfig, opts: &GlobalOpts) -> Result<()> {
    let excludes = Excludes::for_config(config)?;
    let files = scanner::collect_candidates(config, &excludes);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else {
        report::print_candidates(&files, config);
    }
    Ok(())
}

fn cmd_empty(config: &AuditConfig, opts: &GlobalOpts, remove: bool) -> Result<()> {
    let dirs: Vec<PathBuf> = empty_dirs::find_empty_dirs(&[config.api_dir(), config.lib_dir()])
        .context("Failed to walk the action trees")?;

    if opts.json && !remove {
        let relative: Vec<_> = dirs.iter().map(|d| config.relative(d)).collect();
        println!("{}", serde_json::to_string_pretty(&relative)?);
        return Ok(());
    }

    let folders: Vec<_> = dirs
        .iter()
        .map(|d| analyzer::EmptyFolder {
            path: d.clone(),
            relative_path: config.relative(d).to_path_buf(),
        })
        .collect();
    report::print_empty_folders(&folders);

    if remove && !dirs.is_empty() {
        let batch = empty_dirs::remove_empty_dirs(&dirs, opts.dry_run);
        report::print_batch("removed", &batch, config, opts.dry_run);
    }
    Ok(())
}
