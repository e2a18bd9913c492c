//! Route table cross-check.
//!
//! Routes are not part of the reference index. Each entry's page, layout and
//! exec targets are checked by file existence alone.

use crate::config::AuditConfig;
use crate::error::ExtractError;
use crate::normalize::{EntityKind, normalize};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const TEMPLATE_EXTS: [&str; 2] = ["ejs", "html"];

/// One entry of `routes.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Route {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub exec: Option<String>,
    #[serde(default)]
    pub layout: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RouteTable {
    #[serde(default)]
    routes: Vec<Route>,
}

/// A route plus whatever it points at that could not be found.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteReport {
    #[serde(flatten)]
    pub route: Route,
    pub missing: Vec<String>,
}

impl RouteReport {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }

    /// Key used by the ignore list.
    pub fn key(&self) -> String {
        self.route.path.clone().unwrap_or_default()
    }
}

/// Parses a route table. An absent `routes` array means no routes.
pub fn parse_routes(content: &str) -> Result<Vec<Route>, ExtractError> {
    let table: RouteTable = serde_json::from_str(content)?;
    Ok(table.routes)
}

/// Loads the configured routes file. A missing file yields no routes.
pub fn load_routes(config: &AuditConfig) -> Result<Vec<Route>, ExtractError> {
    match std::fs::read_to_string(config.routes_file()) {
        Ok(content) => parse_routes(&content),
        Err(_) => Ok(Vec::new()),
    }
}

/// Checks each route's targets on disk.
pub fn check_routes(config: &AuditConfig, routes: &[Route]) -> Vec<RouteReport> {
    let views = config.views_dir();

    routes
        .iter()
        .map(|route| {
            let mut missing = Vec::new();

            if let Some(page) = route.page.as_deref().and_then(|p| normalize(p, EntityKind::Route))
                && find_template(&views, &page).is_none()
            {
                missing.push(format!("page '{}'", page));
            }

            if let Some(layout) = route
                .layout
                .as_deref()
                .and_then(|l| normalize(l, EntityKind::Route))
                && find_template(&views.join("layouts"), &layout).is_none()
            {
                missing.push(format!("layout '{}'", layout));
            }

            if let Some(exec) = route.exec.as_deref()
                && !exec.trim().is_empty()
            {
                let exists = normalize(exec, EntityKind::Action)
                    .and_then(|key| config.declaration_path(&key))
                    .is_some_and(|path| path.is_file());
                if !exists {
                    missing.push(format!("exec '{}'", exec));
                }
            }

            RouteReport {
                route: route.clone(),
                missing,
            }
        })
        .collect()
}

/// `views/<name>.ejs` or `views/<name>.html`, whichever exists first.
fn find_template(dir: &Path, name: &str) -> Option<PathBuf> {
    let name = name.trim_start_matches('/');
    TEMPLATE_EXTS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .find(|p| p.is_file())
}
