//! action-audit library for finding unreferenced server actions.
//!
//! A project declares actions as JSON files under `app/api` and `app/lib`.
//! This library indexes those declarations and searches the rest of the
//! project for anything that points at them. A scan runs in three phases:
//!
//! 1. **Discovery**: index every declaration carrying an `exec` or `steps` field
//! 2. **Extraction**: pull path-like strings out of markup, JSON and script files
//!    and resolve them against the index
//! 3. **Classification**: actions nothing points at are `safe-to-delete`,
//!    everything else `review-needed`
//!
//! Matching is a static heuristic. Paths assembled at runtime are invisible to
//! it, so an unreferenced action is a candidate for review, not proof.
//!
//! # Example
//!
//! ```no_run
//! use action_audit::{AuditConfig, analyzer};
//!
//! let config = AuditConfig::load("./my-app", &[]).unwrap();
//! let result = analyzer::scan(&config).unwrap();
//!
//! for action in result.unused() {
//!     println!("{} ({})", action.url_path, action.file_path.display());
//! }
//! println!("{} of {} actions are used", result.summary.used, result.summary.total_actions);
//! ```

pub mod analyzer;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod empty_dirs;
pub mod error;
pub mod extractor;
pub mod ignore_list;
pub mod index;
pub mod interactive;
pub mod normalize;
pub mod report;
pub mod routes;
pub mod scanner;

// Re-export commonly used types at crate root
pub use analyzer::{ActionReport, ActionStatus, ScanResult, Summary, scan};
pub use config::AuditConfig;
pub use error::{AuditError, ExtractError};
pub use ignore_list::IgnoreList;
pub use index::{Confidence, Reference};
