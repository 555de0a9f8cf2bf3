use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path};

use crate::classify::Classification;
use crate::config::ConfigError;
use crate::discovery::{self, PatternSet};

/// A named group of instruction files sharing discovery patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub id: String,
    pub name: String,
    pub patterns: Vec<String>,
}

impl CategorySpec {
    fn new(id: &str, name: &str, patterns: &[&str]) -> Self {
        CategorySpec {
            id: id.to_string(),
            name: name.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn builtin() -> Vec<CategorySpec> {
        vec![
            CategorySpec::new(
                "repository_instructions",
                "Repository Instructions",
                &[".github/copilot-instructions.md"],
            ),
            CategorySpec::new(
                "path_instructions",
                "Path-Specific Instructions",
                &[".github/instructions/**/*.instructions.md"],
            ),
            CategorySpec::new("prompt_files", "Prompt Files", &[".github/prompts/**/*.prompt.md"]),
            CategorySpec::new("custom_agents", "Custom Agents", &[".github/agents/**/*.agent.md"]),
            CategorySpec::new(
                "multi_agent_workspace",
                "Multi-Agent Workspace",
                &["AGENTS.md", "CLAUDE.md", "GEMINI.md", "GPT.md", "GROK.md"],
            ),
        ]
    }
}

/// A [`CategorySpec`] with its patterns compiled.
#[derive(Debug, Clone)]
pub struct Category {
    spec: CategorySpec,
    matcher: PatternSet,
}

impl Category {
    pub fn new(spec: CategorySpec) -> Result<Self, ConfigError> {
        if spec.patterns.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "category `{}` has no patterns",
                spec.id
            )));
        }
        if let Some(pattern) = spec.patterns.iter().find(|p| escapes_root(p)) {
            return Err(ConfigError::Invalid(format!(
                "category `{}` pattern `{pattern}` must stay inside the scan root",
                spec.id
            )));
        }
        let matcher = PatternSet::new(&spec.patterns)?;
        Ok(Category { spec, matcher })
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Whether a repo-relative path belongs to this category.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }

    /// Repo-relative paths of member files under `root`, in pattern order.
    /// A file hit by several patterns is listed once.
    pub fn discover(&self, root: &Path) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut members = Vec::new();
        for pattern in &self.spec.patterns {
            for path in discovery::find_files(root, pattern)? {
                let rel = discovery::rel_path(root, &path);
                if seen.insert(rel.clone()) {
                    members.push(rel);
                }
            }
        }
        Ok(members)
    }
}

// Absolute, drive-prefixed or `..` patterns would be joined outside the root.
fn escapes_root(pattern: &str) -> bool {
    pattern.starts_with(['/', '\\'])
        || pattern.split(['/', '\\']).any(|part| part == "..")
        || matches!(Path::new(pattern).components().next(), Some(Component::Prefix(_)))
}

/// The classified files of one category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    pub id: String,
    pub name: String,
    pub files: Vec<Classification>,
}

impl CategoryGroup {
    pub fn total_tokens(&self) -> u64 {
        self.files.iter().map(|f| f.tokens).sum()
    }

    pub fn total_chars(&self) -> u64 {
        self.files.iter().map(|f| f.chars).sum()
    }

    pub fn token_sizes(&self) -> Vec<u64> {
        self.files.iter().map(|f| f.tokens).collect()
    }
}
