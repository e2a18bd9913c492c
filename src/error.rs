//! Error types.
//!
//! Fatal scan failures are [`AuditError`]; anything that only affects a single
//! file is an [`ExtractError`], which callers log and skip.

use crate::analyzer::ScanPhase;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("cannot read {what} directory {}: {source}", path.display())]
    DiscoveryIo {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("required {what} directory does not exist: {}", path.display())]
    MissingRoot { what: &'static str, path: PathBuf },

    #[error("scan phase out of order: expected {expected}, found {found}")]
    PhaseOrder {
        expected: ScanPhase,
        found: ScanPhase,
    },

    #[error("invalid exclude pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Recoverable, per-file failure while reading structured content.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("nesting deeper than {limit} levels")]
    DepthExceeded { limit: usize },
}

pub type Result<T> = std::result::Result<T, AuditError>;
