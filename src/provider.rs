//! LLM provider profiles and instruction-file → provider resolution.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::ConfigError;

/// One model family: how its instruction files are named and how large its
/// context window is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub id: String,
    pub display_name: String,
    /// fnmatch-style patterns tested against the file name and the relative path.
    #[serde(default)]
    pub file_patterns: Vec<String>,
    pub context_window_tokens: u64,
    pub instruction_limit_pct: u64,
}

impl ProviderProfile {
    fn new(
        id: &str,
        display_name: &str,
        file_patterns: &[&str],
        context_window_tokens: u64,
        instruction_limit_pct: u64,
    ) -> Self {
        ProviderProfile {
            id: id.to_string(),
            display_name: display_name.to_string(),
            file_patterns: file_patterns.iter().map(|p| p.to_string()).collect(),
            context_window_tokens,
            instruction_limit_pct,
        }
    }

    /// Instruction budget in tokens, floored.
    pub fn token_limit(&self) -> u64 {
        self.context_window_tokens.saturating_mul(self.instruction_limit_pct) / 100
    }
}

/// Context windows as published by each provider (December 2025); every
/// profile budgets 4% of its window for instructions.
fn builtin_profiles() -> Vec<ProviderProfile> {
    vec![
        ProviderProfile::new("anthropic", "Anthropic Claude", &["CLAUDE.md"], 200_000, 4),
        ProviderProfile::new("google", "Google Gemini", &["GEMINI.md"], 1_048_576, 4),
        ProviderProfile::new("openai", "OpenAI GPT", &["GPT.md", "OPENAI.md"], 1_047_576, 4),
        ProviderProfile::new("xai", "xAI Grok", &["GROK.md", "XAI.md"], 1_000_000, 4),
        // Generic files get the most conservative window.
        ProviderProfile::new(
            "default",
            "Default (Copilot)",
            &[
                "AGENTS.md",
                ".github/copilot-instructions.md",
                ".github/instructions/*.instructions.md",
                ".github/prompts/*.prompt.md",
                ".github/agents/*.agent.md",
            ],
            200_000,
            4,
        ),
    ]
}

/// Ordered provider profiles with exactly one fallback.
#[derive(Debug, Clone)]
pub struct ProviderTable {
    profiles: Vec<ProviderProfile>,
    matchers: Vec<GlobSet>,
    fallback: usize,
}

impl ProviderTable {
    pub fn new(profiles: Vec<ProviderProfile>, fallback_id: &str) -> Result<Self, ConfigError> {
        let mut ids = HashSet::new();
        for profile in &profiles {
            if !ids.insert(profile.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate provider id `{}`",
                    profile.id
                )));
            }
            if profile.instruction_limit_pct == 0 {
                return Err(ConfigError::Invalid(format!(
                    "provider `{}` has a zero instruction_limit_pct",
                    profile.id
                )));
            }
        }
        let fallback = profiles
            .iter()
            .position(|p| p.id == fallback_id)
            .ok_or_else(|| {
                ConfigError::Invalid(format!("fallback provider `{fallback_id}` is not defined"))
            })?;
        let matchers = profiles
            .iter()
            .map(|p| compile_patterns(&p.file_patterns))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProviderTable {
            profiles,
            matchers,
            fallback,
        })
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        ProviderTable::new(builtin_profiles(), "default")
    }

    pub fn profiles(&self) -> &[ProviderProfile] {
        &self.profiles
    }

    pub fn fallback(&self) -> &ProviderProfile {
        &self.profiles[self.fallback]
    }

    pub fn is_fallback(&self, id: &str) -> bool {
        self.fallback().id == id
    }

    /// Resolve the profile for a file. Tests the file name and the whole
    /// relative path against each non-fallback profile in declaration order;
    /// the first hit wins, otherwise the fallback.
    pub fn resolve(&self, rel_path: &str) -> &ProviderProfile {
        let normalized = rel_path.replace('\\', "/");
        let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);
        for (i, (profile, set)) in self.profiles.iter().zip(&self.matchers).enumerate() {
            if i == self.fallback {
                continue;
            }
            if set.is_match(file_name) || set.is_match(&normalized) {
                return profile;
            }
        }
        self.fallback()
    }

    /// Token limit for a provider id. Unknown ids get the fallback's limit.
    pub fn token_limit(&self, id: &str) -> u64 {
        match self.profiles.iter().find(|p| p.id == id) {
            Some(profile) => profile.token_limit(),
            None => self.fallback().token_limit(),
        }
    }
}

// `*` may cross `/` here, matching fnmatch rather than path globbing.
fn compile_patterns(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ConfigError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}
