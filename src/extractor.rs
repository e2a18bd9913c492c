//! Reference extraction.
//!
//! Each file category has its own strategy, a pure function from content to
//! raw `(path, provenance)` pairs. Nothing here touches the filesystem or the
//! index; normalization and resolution happen in the analyzer.

use crate::error::ExtractError;
use crate::normalize::{API_PREFIX, EntityKind, normalize, strip_query};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

/// Maximum container nesting walked in a structured file.
pub const MAX_DEPTH: usize = 100;

/// Field names in structured files that hold a direct path reference.
const QUEUE_FILE_FIELD: &str = "api_file";
const EXEC_FIELD: &str = "exec";
const MODULE_FIELD: &str = "module";
/// Free-text fields that may embed URLs inside a larger string.
const TEXT_FIELDS: [&str; 3] = ["value", "url", "link"];

/// Which pattern produced a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    MarkupUrlAttribute,
    MarkupActionAttribute,
    EmbeddedUrlString,
    TemplateUrlString,
    QueueFileField,
    ExecField,
    ModuleField,
    ScriptFetchCall,
    ScriptAjaxUrl,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::MarkupUrlAttribute => "markup-url-attribute",
            Provenance::MarkupActionAttribute => "markup-action-attribute",
            Provenance::EmbeddedUrlString => "embedded-url-string",
            Provenance::TemplateUrlString => "template-url-string",
            Provenance::QueueFileField => "queue-file-field",
            Provenance::ExecField => "exec-field",
            Provenance::ModuleField => "module-field",
            Provenance::ScriptFetchCall => "script-fetch-call",
            Provenance::ScriptAjaxUrl => "script-ajax-url",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A path-like string found in content, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRef {
    pub raw: String,
    pub provenance: Provenance,
}

impl RawRef {
    fn new(raw: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            raw: raw.into(),
            provenance,
        }
    }
}

/// Extraction strategy, chosen from extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Markup,
    Structured,
    Script,
}

impl FileCategory {
    pub fn classify(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "html" | "ejs" => Some(FileCategory::Markup),
            "json" => Some(FileCategory::Structured),
            "js" => Some(FileCategory::Script),
            _ => None,
        }
    }

    /// Runs this category's strategy over raw file content.
    pub fn extract(self, content: &str) -> Result<Vec<RawRef>, ExtractError> {
        match self {
            FileCategory::Markup => Ok(extract_markup(content)),
            FileCategory::Script => Ok(extract_script(content)),
            FileCategory::Structured => {
                let value: Value = serde_json::from_str(content)?;
                extract_structured(&value)
            }
        }
    }
}

static URL_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\burl\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid url attribute regex")
});

static ACTION_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\baction\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid action attribute regex")
});

static HREF_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid href attribute regex")
});

/// `/api/...` up to whitespace, a quote, `?`, `&`, or markup delimiters.
static API_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"/api/[^\s"'`?&#<>]+"#).expect("valid api url regex")
});

/// `/api/...` at the start of a quoted string that is concatenated with `+`,
/// or of a backtick template with a `${...}` placeholder.
static API_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"'(/api/[^'\s?&#]+)[^']*'\s*\+"#,
        r#"|"(/api/[^"\s?&#]+)[^"]*"\s*\+"#,
        r"|`(/api/[^`\s?&#$]+)[^`]*\$\{",
    ))
    .expect("valid api template regex")
});

static FETCH_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bfetch\s*\(\s*['"`](/api/[^'"`\s?&#$]+)"#).expect("valid fetch regex")
});

static AJAX_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\burl\s*:\s*['"`](/api/[^'"`\s?&#$]+)"#).expect("valid ajax url regex")
});

/// Scans free text for API paths.
///
/// Template-style strings (`'/api/x?token=' + tok`) are reported as
/// [`Provenance::TemplateUrlString`]; every other `/api/...` occurrence outside
/// them is an [`Provenance::EmbeddedUrlString`]. Query strings and fragments are
/// dropped.
pub fn scan_urls(text: &str) -> Vec<RawRef> {
    scan_urls_spanned(text, &[])
        .into_iter()
        .map(|(_, r)| r)
        .collect()
}

/// Like [`scan_urls`], skipping matches that overlap any range in `covered`.
fn scan_urls_spanned(text: &str, covered: &[Range<usize>]) -> Vec<(Range<usize>, RawRef)> {
    if !text.contains(API_PREFIX) {
        return Vec::new();
    }

    let mut found: Vec<(Range<usize>, RawRef)> = Vec::new();
    let mut taken: Vec<Range<usize>> = covered.to_vec();

    for caps in API_TEMPLATE.captures_iter(text) {
        let Some(path) = caps.iter().skip(1).flatten().next() else {
            continue;
        };
        let span = path.range();
        if overlaps(&taken, &span) {
            continue;
        }
        taken.push(caps.get(0).map_or(span.clone(), |m| m.range()));
        found.push((span, RawRef::new(path.as_str(), Provenance::TemplateUrlString)));
    }

    for m in API_URL.find_iter(text) {
        let span = m.range();
        if overlaps(&taken, &span) {
            continue;
        }
        let path = strip_query(m.as_str()).trim_end_matches(['.', ',', ';', ':', ')', ']', '}']);
        found.push((span, RawRef::new(path, Provenance::EmbeddedUrlString)));
    }

    found.sort_by_key(|(span, _)| span.start);
    found
}

fn overlaps(ranges: &[Range<usize>], span: &Range<usize>) -> bool {
    ranges
        .iter()
        .any(|r| r.start < span.end && span.start < r.end)
}

/// Markup strategy: `url="..."`, `action="..."`, API-bearing `href="..."`, then
/// a free-text URL scan of everything the attribute patterns did not resolve.
pub fn extract_markup(content: &str) -> Vec<RawRef> {
    let mut found: Vec<(Range<usize>, RawRef)> = Vec::new();
    let mut covered: Vec<Range<usize>> = Vec::new();

    for (re, provenance) in [
        (&*URL_ATTR, Provenance::MarkupUrlAttribute),
        (&*ACTION_ATTR, Provenance::MarkupActionAttribute),
    ] {
        for caps in re.captures_iter(content) {
            let Some(value) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };
            // Values that name nothing, or only embed an API path behind a
            // prefix, are left for the text scan.
            let raw = value.as_str();
            let embedded = raw.contains(API_PREFIX)
                && !raw.starts_with(API_PREFIX)
                && !raw.starts_with("/app/");
            if embedded || normalize(raw, EntityKind::Action).is_none() {
                continue;
            }
            covered.push(value.range());
            found.push((value.range(), RawRef::new(value.as_str(), provenance)));
        }
    }

    for caps in HREF_ATTR.captures_iter(content) {
        let Some(value) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        if !value.as_str().contains(API_PREFIX) {
            continue;
        }
        let offset = value.start();
        for (span, raw) in scan_urls_spanned(value.as_str(), &[]) {
            let span = span.start + offset..span.end + offset;
            covered.push(value.range());
            found.push((span, raw));
        }
    }

    found.extend(scan_urls_spanned(content, &covered));
    found.sort_by_key(|(span, _)| span.start);
    found.into_iter().map(|(_, r)| r).collect()
}

/// Script strategy: `fetch('/api/...')` calls and `url: '/api/...'` fields.
pub fn extract_script(content: &str) -> Vec<RawRef> {
    let mut found: Vec<(usize, RawRef)> = Vec::new();
    for (re, provenance) in [
        (&*FETCH_CALL, Provenance::ScriptFetchCall),
        (&*AJAX_URL, Provenance::ScriptAjaxUrl),
    ] {
        for caps in re.captures_iter(content) {
            if let Some(path) = caps.get(1) {
                found.push((path.start(), RawRef::new(path.as_str(), provenance)));
            }
        }
    }
    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, r)| r).collect()
}

/// Structured strategy: walks every object and array looking for reference
/// fields.
///
/// `api_file`, `exec` and `module` string values are direct references.
/// `value`, `url` and `link` strings go through [`scan_urls`]. The walk uses
/// an explicit stack and fails with [`ExtractError::DepthExceeded`] past
/// [`MAX_DEPTH`] nested containers.
pub fn extract_structured(root: &Value) -> Result<Vec<RawRef>, ExtractError> {
    let mut refs = Vec::new();
    let mut stack: Vec<(&Value, usize)> = vec![(root, 1)];

    while let Some((value, depth)) = stack.pop() {
        if depth > MAX_DEPTH {
            return Err(ExtractError::DepthExceeded { limit: MAX_DEPTH });
        }
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if let Value::String(s) = child {
                        refs.extend(field_refs(key, s));
                    }
                }
                for child in map.values().rev() {
                    if child.is_object() || child.is_array() {
                        stack.push((child, depth + 1));
                    }
                }
            }
            Value::Array(items) => {
                for child in items.iter().rev() {
                    if child.is_object() || child.is_array() {
                        stack.push((child, depth + 1));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(refs)
}

fn field_refs(key: &str, value: &str) -> Vec<RawRef> {
    match key {
        QUEUE_FILE_FIELD => vec![RawRef::new(value, Provenance::QueueFileField)],
        EXEC_FIELD => vec![RawRef::new(value, Provenance::ExecField)],
        MODULE_FIELD => vec![RawRef::new(value, Provenance::ModuleField)],
        k if TEXT_FIELDS.contains(&k) => scan_urls(value),
        _ => Vec::new(),
    }
}
