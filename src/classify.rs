//! Severity classification against provider token limits and category budgets.

use serde::Serialize;
use std::fmt;
use std::num::NonZeroU64;

use crate::measure::estimate_tokens;
use crate::provider::ProviderProfile;

/// Outcome of a size check, ordered by increasing concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Bracketed marker used in the text report.
    pub fn marker(self) -> &'static str {
        match self {
            Severity::Ok => "[OK]",
            Severity::Info => "[INFO]",
            Severity::Warning => "[WARN]",
            Severity::Error => "[ERR]",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Ok => "ok",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// Info and warn levels as whole percentages of a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub info_pct: u64,
    pub warn_pct: u64,
}

impl Thresholds {
    /// Four-tier rule. Every comparison is strict: a value equal to a
    /// threshold stays in the lower tier, so `value == limit` is a warning.
    pub fn severity(&self, value: u64, limit: u64) -> Severity {
        let info = limit.saturating_mul(self.info_pct) / 100;
        let warn = limit.saturating_mul(self.warn_pct) / 100;
        if value > limit {
            Severity::Error
        } else if value > warn {
            Severity::Warning
        } else if value > info {
            Severity::Info
        } else {
            Severity::Ok
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub path: String,
    pub chars: u64,
    pub tokens: u64,
    pub token_limit: u64,
    pub provider: String,
    pub provider_name: String,
    pub severity: Severity,
}

/// Classify one file of `char_count` characters against its provider's limit.
pub fn classify(
    path: &str,
    char_count: u64,
    provider: &ProviderProfile,
    chars_per_token: NonZeroU64,
    thresholds: Thresholds,
) -> Classification {
    let tokens = estimate_tokens(char_count, chars_per_token);
    let token_limit = provider.token_limit();
    Classification {
        path: path.to_string(),
        chars: char_count,
        tokens,
        token_limit,
        provider: provider.id.clone(),
        provider_name: provider.display_name.clone(),
        severity: thresholds.severity(tokens, token_limit),
    }
}

/// Result of checking a category's combined size against its budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryResult {
    pub category_id: String,
    pub category: String,
    pub total_chars: u64,
    pub budget: u64,
    pub severity: Severity,
}

/// Same four-tier rule as [`classify`], applied to a character total against
/// a character budget.
pub fn classify_category(
    category_id: &str,
    category: &str,
    total_chars: u64,
    budget: u64,
    thresholds: Thresholds,
) -> CategoryResult {
    CategoryResult {
        category_id: category_id.to_string(),
        category: category.to_string(),
        total_chars,
        budget,
        severity: thresholds.severity(total_chars, budget),
    }
}
