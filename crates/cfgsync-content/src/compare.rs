//! Comparison of two repository trees
//!
//! Every file below either root is classified as matching, added, removed,
//! changed or unreadable. Matching files produce no [`Issue`]; the rest are
//! returned sorted by relative path so repeated runs over the same trees
//! produce identical output.

use std::collections::BTreeSet;
use std::fmt;

use cfgsync_fs::checksum::Checksum;
use cfgsync_fs::{FileListing, NormalizedPath, io, list_files};
use regex::Regex;
use serde::{Deserialize, Serialize};
use similar::TextDiff;

use crate::error::{Error, Result};

/// Maximum number of diff lines kept in an issue's detail
const MAX_SNIPPET_LINES: usize = 24;

/// Classification of one difference between two trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// Present only in the right-hand (target) tree
    Added,
    /// Present only in the left-hand (reference) tree
    Removed,
    /// Present in both with different content
    Changed,
    /// Present but could not be read on at least one side
    Unreadable,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Added => "Added",
            Self::Removed => "Removed",
            Self::Changed => "Changed",
            Self::Unreadable => "Unreadable",
        };
        f.write_str(label)
    }
}

/// One detected difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Path relative to both roots, with forward slashes
    pub path: String,
    pub kind: IssueKind,
    /// Diff snippet or error message, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Issue {
    pub fn new(path: impl Into<String>, kind: IssueKind) -> Self {
        Self {
            path: path.into(),
            kind,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

/// Comparison settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Lines matching any of these regexes are dropped before comparing
    pub ignored_line_patterns: Vec<String>,
    /// Treat CRLF and LF line endings as equal
    pub normalize_line_endings: bool,
    /// File names (last path segment) skipped on both sides
    pub ignored_file_names: Vec<String>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            ignored_line_patterns: Vec::new(),
            normalize_line_endings: true,
            ignored_file_names: vec![".DS_Store".to_string(), "Thumbs.db".to_string()],
        }
    }
}

/// Directory comparator with compiled options.
#[derive(Debug, Clone)]
pub struct Comparator {
    ignored_lines: Vec<Regex>,
    normalize_line_endings: bool,
    ignored_file_names: BTreeSet<String>,
}

impl Comparator {
    pub fn new(options: &CompareOptions) -> Result<Self> {
        let ignored_lines = options
            .ignored_line_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| Error::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            ignored_lines,
            normalize_line_endings: options.normalize_line_endings,
            ignored_file_names: options.ignored_file_names.iter().cloned().collect(),
        })
    }

    /// Compare `left` (reference) against `right` (target).
    ///
    /// # Errors
    ///
    /// Fails only when either root cannot be listed; per-file problems are
    /// reported as [`IssueKind::Unreadable`] issues.
    pub fn compare(&self, left: &NormalizedPath, right: &NormalizedPath) -> Result<Vec<Issue>> {
        let left_listing = list_files(left)?;
        let right_listing = list_files(right)?;

        let mut issues = Vec::new();
        self.unreadable_entries(&left_listing, &mut issues);
        self.unreadable_entries(&right_listing, &mut issues);

        let unreadable: BTreeSet<&str> = left_listing
            .unreadable
            .iter()
            .chain(right_listing.unreadable.iter())
            .map(|(path, _)| path.as_str())
            .collect();

        let all: BTreeSet<&String> = left_listing
            .files
            .iter()
            .chain(right_listing.files.iter())
            .collect();

        for path in all {
            if self.is_ignored(path) || unreadable.contains(path.as_str()) {
                continue;
            }
            let in_left = left_listing.files.contains(path);
            let in_right = right_listing.files.contains(path);

            let issue = match (in_left, in_right) {
                (true, false) => Some(Issue::new(path.as_str(), IssueKind::Removed)),
                (false, true) => Some(Issue::new(path.as_str(), IssueKind::Added)),
                _ => self.compare_file(path, &left.join(path), &right.join(path)),
            };
            if let Some(issue) = issue {
                tracing::debug!(path = %issue.path, kind = %issue.kind, "Difference found");
                issues.push(issue);
            }
        }

        issues.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));
        issues.dedup_by(|a, b| a.path == b.path && a.kind == b.kind);
        Ok(issues)
    }

    fn is_ignored(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        self.ignored_file_names.contains(name)
    }

    fn unreadable_entries(&self, listing: &FileListing, issues: &mut Vec<Issue>) {
        for (path, reason) in &listing.unreadable {
            if !self.is_ignored(path) {
                issues.push(Issue::new(path.as_str(), IssueKind::Unreadable).with_detail(reason.as_str()));
            }
        }
    }

    fn compare_file(
        &self,
        relative: &str,
        left: &NormalizedPath,
        right: &NormalizedPath,
    ) -> Option<Issue> {
        let (left_bytes, right_bytes) = match (io::read_bytes(left), io::read_bytes(right)) {
            (Ok(l), Ok(r)) => (l, r),
            (Err(e), _) | (_, Err(e)) => {
                return Some(Issue::new(relative, IssueKind::Unreadable).with_detail(e.to_string()));
            }
        };

        if left_bytes == right_bytes {
            return None;
        }

        match (std::str::from_utf8(&left_bytes), std::str::from_utf8(&right_bytes)) {
            (Ok(l), Ok(r)) => {
                let l = self.normalize(l);
                let r = self.normalize(r);
                if l == r {
                    None
                } else {
                    Some(Issue::new(relative, IssueKind::Changed).with_detail(snippet(&l, &r)))
                }
            }
            _ => Some(Issue::new(relative, IssueKind::Changed).with_detail(format!(
                "binary content differs ({} vs {})",
                Checksum::of(&left_bytes),
                Checksum::of(&right_bytes)
            ))),
        }
    }

    /// Apply line-ending normalization and drop ignored lines.
    pub fn normalize(&self, text: &str) -> String {
        let text = if self.normalize_line_endings {
            text.replace("\r\n", "\n")
        } else {
            text.to_string()
        };
        if self.ignored_lines.is_empty() {
            return text;
        }
        text.split_inclusive('\n')
            .filter(|line| {
                let content = line.trim_end_matches(['\r', '\n']);
                !self.ignored_lines.iter().any(|re| re.is_match(content))
            })
            .collect()
    }
}

/// Compare two trees with the given options.
pub fn compare_directories(
    left: &NormalizedPath,
    right: &NormalizedPath,
    options: &CompareOptions,
) -> Result<Vec<Issue>> {
    Comparator::new(options)?.compare(left, right)
}

/// Unified diff of two texts, truncated to [`MAX_SNIPPET_LINES`] lines.
fn snippet(left: &str, right: &str) -> String {
    let diff = TextDiff::from_lines(left, right);
    let unified = diff
        .unified_diff()
        .context_radius(1)
        .header("reference", "target")
        .to_string();

    let mut lines: Vec<&str> = unified.lines().collect();
    if lines.len() > MAX_SNIPPET_LINES {
        let omitted = lines.len() - MAX_SNIPPET_LINES;
        lines.truncate(MAX_SNIPPET_LINES);
        return format!("{}\n... {omitted} more lines", lines.join("\n"));
    }
    lines.join("\n")
}
