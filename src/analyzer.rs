//! Scan orchestration and classification.
//!
//! A scan moves through `idle -> discovering -> extracting -> classified`.
//! Every declaration is indexed before any file is searched for references,
//! so a reference to an action discovered late still resolves. The finished
//! [`ScanResult`] is an immutable snapshot; deleting files means scanning
//! again.

use crate::config::AuditConfig;
use crate::error::{AuditError, ExtractError, Result};
use crate::index::{Action, ActionIndex, Confidence, Reference};
use crate::normalize::{API_PREFIX, EntityKind, LIB_PREFIX, action_key_for_file, normalize};
use crate::routes::{RouteReport, check_routes, load_routes};
use crate::scanner::{self, CandidateFiles, Excludes};
use crate::{empty_dirs, extractor::FileCategory};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScanPhase {
    Idle,
    Discovering,
    Extracting,
    Classified,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Discovering => "discovering",
            ScanPhase::Extracting => "extracting",
            ScanPhase::Classified => "classified",
        })
    }
}

/// Three-way label shown to users. Deletion confidence stays two-tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionStatus {
    Used,
    PossiblyUnused,
    LikelyUnused,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionStatus::Used => "used",
            ActionStatus::PossiblyUnused => "possibly unused",
            ActionStatus::LikelyUnused => "likely unused",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_actions: usize,
    pub used: usize,
    pub possibly_unused: usize,
    pub likely_unused: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReport {
    pub url_path: String,
    pub file_path: PathBuf,
    pub status: ActionStatus,
    pub confidence: Confidence,
    pub reference_count: usize,
    pub references: Vec<Reference>,
    pub content: Value,
    /// Unresolved keys sharing this action's last path segment.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub near_misses: Vec<String>,
}

impl ActionReport {
    pub fn is_unused(&self) -> bool {
        self.confidence == Confidence::SafeToDelete
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyFolder {
    pub path: PathBuf,
    pub relative_path: PathBuf,
}

/// Counters from a scan run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub files_scanned: usize,
    pub total_refs: usize,
    pub resolved_refs: usize,
    pub unresolved_refs: usize,
    /// Files left out because they could not be read or parsed.
    pub skipped_files: BTreeSet<PathBuf>,
}

/// Finished scan output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub summary: Summary,
    pub actions: Vec<ActionReport>,
    pub empty_folders: Vec<EmptyFolder>,
    pub routes: Vec<RouteReport>,
    pub diagnostics: Diagnostics,
    #[serde(skip)]
    pub unresolved: BTreeMap<String, Vec<Reference>>,
}

impl ScanResult {
    pub fn action(&self, key: &str) -> Option<&ActionReport> {
        self.actions.iter().find(|a| a.url_path == key)
    }

    pub fn unused(&self) -> impl Iterator<Item = &ActionReport> {
        self.actions.iter().filter(|a| a.is_unused())
    }
}

/// One scan over a project. Drive it with [`Scan::discover`],
/// [`Scan::extract`] and [`Scan::classify`] in that order, or call [`scan`].
#[derive(Debug)]
pub struct Scan<'a> {
    config: &'a AuditConfig,
    excludes: Excludes,
    phase: ScanPhase,
    index: ActionIndex,
    diagnostics: Diagnostics,
}

impl<'a> Scan<'a> {
    pub fn new(config: &'a AuditConfig) -> Result<Self> {
        Ok(Self {
            config,
            excludes: Excludes::for_config(config)?,
            phase: ScanPhase::Idle,
            index: ActionIndex::new(),
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn index(&self) -> &ActionIndex {
        &self.index
    }

    fn advance(&mut self, expected: ScanPhase, next: ScanPhase) -> Result<()> {
        if self.phase != expected {
            return Err(AuditError::PhaseOrder {
                expected,
                found: self.phase,
            });
        }
        debug!(from = %self.phase, to = %next, "scan phase");
        self.phase = next;
        Ok(())
    }

    fn skip(&mut self, file: &Path, reason: impl fmt::Display) {
        if self.diagnostics.skipped_files.insert(file.to_path_buf()) {
            warn!("skipping {}: {}", file.display(), reason);
        }
    }

    /// Indexes every declaration under the API and library trees.
    ///
    /// Both trees must exist; a missing or unreadable root aborts the scan.
    pub fn discover(&mut self) -> Result<()> {
        self.advance(ScanPhase::Idle, ScanPhase::Discovering)?;

        let api_dir = self.config.api_dir();
        let lib_dir = self.config.lib_dir();
        let trees = [
            (
                scanner::collect_declaration_files(&api_dir, "api", &self.excludes)?,
                api_dir,
                API_PREFIX,
            ),
            (
                scanner::collect_declaration_files(&lib_dir, "lib", &self.excludes)?,
                lib_dir,
                LIB_PREFIX,
            ),
        ];

        for (files, tree_root, namespace) in trees {
            for file in files {
                let content = match std::fs::read_to_string(&file) {
                    Ok(content) => content,
                    Err(err) => {
                        self.skip(&file, err);
                        continue;
                    }
                };
                let value: Value = match serde_json::from_str(&content) {
                    Ok(value) => value,
                    Err(err) => {
                        self.skip(&file, ExtractError::Parse(err));
                        continue;
                    }
                };
                if !Action::is_declaration(&value) {
                    continue;
                }
                let Some(key) = action_key_for_file(&tree_root, namespace, &file) else {
                    continue;
                };
                if !self.index.insert(Action::new(key.clone(), file, value)) {
                    warn!("duplicate declaration for {}, keeping the first", key);
                }
            }
        }

        info!(actions = self.index.len(), "discovered actions");
        Ok(())
    }

    /// Runs every candidate file through its extraction strategy.
    pub fn extract(&mut self) -> Result<()> {
        self.advance(ScanPhase::Discovering, ScanPhase::Extracting)?;

        let candidates = scanner::collect_candidates(self.config, &self.excludes);
        debug!(
            markup = candidates.markup.len(),
            structured = candidates.structured.len(),
            script = candidates.script.len(),
            "candidate files"
        );
        self.diagnostics.files_scanned = candidates.len();

        for (category, file) in candidates.iter() {
            self.extract_file(category, file);
        }
        Ok(())
    }

    fn extract_file(&mut self, category: FileCategory, file: &Path) {
        let content = match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(err) => {
                self.skip(file, err);
                return;
            }
        };
        let raws = match category.extract(&content) {
            Ok(raws) => raws,
            Err(err) => {
                self.skip(file, err);
                return;
            }
        };

        for raw in raws {
            let Some(key) = normalize(&raw.raw, EntityKind::Action) else {
                continue;
            };
            self.diagnostics.total_refs += 1;
            let reference = Reference {
                file: file.to_path_buf(),
                provenance: raw.provenance,
                original: raw.raw,
            };
            if self.index.record(&key, reference) {
                self.diagnostics.resolved_refs += 1;
            } else {
                self.diagnostics.unresolved_refs += 1;
            }
        }
    }

    /// Classifies every action and gathers routes and empty folders.
    pub fn classify(&mut self) -> Result<ScanResult> {
        self.advance(ScanPhase::Extracting, ScanPhase::Classified)?;

        let mut actions: Vec<ActionReport> = self
            .index
            .actions()
            .iter()
            .map(|action| {
                let near_misses: Vec<String> = if action.references.is_empty() {
                    self.index
                        .near_misses(&action.key)
                        .into_iter()
                        .map(String::from)
                        .collect()
                } else {
                    Vec::new()
                };
                let status = match (action.references.len(), near_misses.is_empty()) {
                    (0, true) => ActionStatus::LikelyUnused,
                    (0, false) => ActionStatus::PossiblyUnused,
                    _ => ActionStatus::Used,
                };
                ActionReport {
                    url_path: action.key.clone(),
                    file_path: action.file.clone(),
                    status,
                    confidence: action.confidence(),
                    reference_count: action.references.len(),
                    references: action.references.clone(),
                    content: action.content.clone(),
                    near_misses,
                }
            })
            .collect();
        // Stable: discovery order is kept within each tier.
        actions.sort_by_key(|a| !a.is_unused());

        let summary = summarize(&actions);

        let empty_folders = empty_dirs::find_empty_dirs(&[
            self.config.api_dir(),
            self.config.lib_dir(),
        ])?
        .into_iter()
        .map(|path| EmptyFolder {
            relative_path: self.config.relative(&path).to_path_buf(),
            path,
        })
        .collect();

        let routes = match load_routes(self.config) {
            Ok(routes) => check_routes(self.config, &routes),
            Err(err) => {
                let routes_file = self.config.routes_file();
                self.skip(&routes_file, err);
                Vec::new()
            }
        };

        info!(
            total = summary.total_actions,
            used = summary.used,
            possibly_unused = summary.possibly_unused,
            likely_unused = summary.likely_unused,
            "scan complete"
        );

        Ok(ScanResult {
            summary,
            actions,
            empty_folders,
            routes,
            diagnostics: self.diagnostics.clone(),
            unresolved: self.index.unresolved().clone(),
        })
    }
}

fn summarize(actions: &[ActionReport]) -> Summary {
    let count = |status| actions.iter().filter(|a| a.status == status).count();
    Summary {
        total_actions: actions.len(),
        used: count(ActionStatus::Used),
        possibly_unused: count(ActionStatus::PossiblyUnused),
        likely_unused: count(ActionStatus::LikelyUnused),
    }
}

/// Runs a complete scan.
pub fn scan(config: &AuditConfig) -> Result<ScanResult> {
    let mut scan = Scan::new(config)?;
    scan.discover()?;
    scan.extract()?;
    scan.classify()
}
