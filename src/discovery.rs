//! Find instruction files on disk by exact path or glob.

use anyhow::Result;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ConfigError;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Path globs where `*` stops at `/` and `**` spans directories.
pub fn compile(pattern: &str) -> Result<Glob, ConfigError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| ConfigError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// A compiled set of discovery patterns, matched against repo-relative paths.
#[derive(Debug, Clone)]
pub struct PatternSet {
    set: GlobSet,
}

impl PatternSet {
    pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(compile(pattern)?);
        }
        let set = builder.build().map_err(|source| ConfigError::Pattern {
            pattern: patterns.join(", "),
            source,
        })?;
        Ok(PatternSet { set })
    }

    pub fn is_match(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }
}

/// Files under `root` matching `pattern`. An existing file at `root/pattern`
/// is returned as-is; otherwise the pattern is globbed from its literal
/// directory prefix. Results are sorted. `.git` is never entered.
pub fn find_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let exact = root.join(pattern);
    if exact.is_file() {
        return Ok(vec![exact]);
    }
    if !pattern.contains(GLOB_META) {
        return Ok(Vec::new());
    }

    let matcher = compile(pattern)?.compile_matcher();
    let base = root.join(literal_prefix(pattern));
    if !base.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let walker = WalkDir::new(&base)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        // Symlinked files count; symlinked directories are not descended.
        if !entry.path().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        if matcher.is_match(to_slash(rel)) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Forward-slash form of a relative path.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// `path` relative to `root`, forward-slashed.
pub fn rel_path(root: &Path, path: &Path) -> String {
    to_slash(path.strip_prefix(root).unwrap_or(path))
}

// Leading directories of the pattern that contain no glob syntax.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    let mut parts = pattern.split('/').peekable();
    while let Some(part) = parts.next() {
        // The final segment names files, not a directory to descend into.
        if parts.peek().is_none() || part.contains(GLOB_META) {
            break;
        }
        prefix.push(part);
    }
    prefix
}
