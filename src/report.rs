//! Check results and their text / JSON rendering.

use anyhow::Result;
use serde::Serialize;
use std::fmt;

use crate::category::CategoryGroup;
use crate::classify::{CategoryResult, Severity};
use crate::outlier::{BaselineReport, BaselineStatus, Outlier};
use crate::provider::{ProviderProfile, ProviderTable};
use crate::stats::Direction;

const RULE_WIDTH: usize = 70;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutlierAnalysis {
    /// Fences from each category's current files.
    SelfReferential {
        multiplier: f64,
        outliers: Vec<Outlier>,
    },
    /// Fences from the reference revision, applied to changed files.
    Baseline {
        reference: String,
        multiplier: f64,
        categories: Vec<BaselineReport>,
    },
}

impl OutlierAnalysis {
    pub fn outliers(&self) -> Vec<&Outlier> {
        match self {
            OutlierAnalysis::SelfReferential { outliers, .. } => outliers.iter().collect(),
            OutlierAnalysis::Baseline { categories, .. } => categories
                .iter()
                .filter_map(|c| match &c.status {
                    BaselineStatus::Checked { outliers, .. } => Some(outliers),
                    _ => None,
                })
                .flatten()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub categories: Vec<CategoryGroup>,
    pub budgets: Vec<CategoryResult>,
    pub outliers: OutlierAnalysis,
    pub total_tokens: u64,
    pub total_files: usize,
    pub errors: usize,
    pub warnings: usize,
    pub passed: bool,
}

impl Report {
    pub fn new(
        categories: Vec<CategoryGroup>,
        budgets: Vec<CategoryResult>,
        outliers: OutlierAnalysis,
    ) -> Self {
        let files = || categories.iter().flat_map(|g| &g.files);
        let severities = files()
            .map(|f| f.severity)
            .chain(budgets.iter().map(|b| b.severity));
        let (mut errors, mut warnings) = (0, 0);
        for severity in severities {
            match severity {
                Severity::Error => errors += 1,
                Severity::Warning => warnings += 1,
                Severity::Ok | Severity::Info => {}
            }
        }
        let total_tokens = files().map(|f| f.tokens).sum();
        let total_files = files().count();
        Report {
            categories,
            budgets,
            outliers,
            total_tokens,
            total_files,
            errors,
            warnings,
            passed: errors == 0,
        }
    }

    pub fn print_json(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Low => "LOW",
        Direction::High => "HIGH",
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validating instruction file token limits...")?;
        if let OutlierAnalysis::Baseline { reference, .. } = &self.outliers {
            writeln!(f, "Baseline comparison mode: comparing to {reference}")?;
        }
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;

        if self.total_files == 0 {
            writeln!(f, "\n  No instruction files found")?;
        }
        for group in self.categories.iter().filter(|g| !g.files.is_empty()) {
            writeln!(f, "\n{}:", group.name)?;
            for file in &group.files {
                writeln!(
                    f,
                    "  {:<6} {:<50} {:>5} / {:>5} tokens ({:>6} chars) [{}]",
                    file.severity.marker(),
                    file.path,
                    file.tokens,
                    file.token_limit,
                    file.chars,
                    file.provider_name
                )?;
            }
            if group.files.len() > 1 {
                writeln!(
                    f,
                    "  --- {} tokens ({} files)",
                    group.total_tokens(),
                    group.files.len()
                )?;
            }
        }

        if !self.budgets.is_empty() {
            writeln!(f, "\nCategory Budgets:")?;
            for budget in &self.budgets {
                writeln!(
                    f,
                    "  {:<6} {}: {} / {} chars",
                    budget.severity.marker(),
                    budget.category,
                    budget.total_chars,
                    budget.budget
                )?;
            }
        }

        match &self.outliers {
            OutlierAnalysis::SelfReferential { multiplier, outliers } => {
                writeln!(f, "\nOutlier Analysis (IQR method, {multiplier}x multiplier):")?;
                for o in outliers {
                    writeln!(
                        f,
                        "  {}: {} ({} tokens, {:+} vs median) [{}]",
                        o.category,
                        o.path,
                        o.tokens,
                        o.deviation,
                        direction_label(o.direction)
                    )?;
                }
                if outliers.is_empty() {
                    writeln!(f, "  No outliers detected")?;
                }
            }
            OutlierAnalysis::Baseline {
                reference,
                multiplier,
                categories,
            } => {
                writeln!(
                    f,
                    "\nOutlier Analysis (baseline from {reference}, {multiplier}x multiplier):"
                )?;
                for report in categories {
                    write_baseline(f, report, reference)?;
                }
                if self.outliers.outliers().is_empty() {
                    writeln!(f, "  No outliers in changed files")?;
                }
            }
        }

        writeln!(f, "\n{}", "=".repeat(RULE_WIDTH))?;
        writeln!(
            f,
            "Overall: {} tokens across {} files",
            self.total_tokens, self.total_files
        )?;
        writeln!(
            f,
            "Summary: {} error(s), {} warning(s)",
            self.errors, self.warnings
        )?;
        if self.passed {
            writeln!(f, "Validation passed!")
        } else {
            writeln!(f, "Validation failed!")
        }
    }
}

fn write_baseline(f: &mut fmt::Formatter<'_>, report: &BaselineReport, reference: &str) -> fmt::Result {
    match &report.status {
        BaselineStatus::Unavailable => writeln!(
            f,
            "  {}: Baseline unavailable (could not read {reference})",
            report.category
        ),
        BaselineStatus::Insufficient { samples } => writeln!(
            f,
            "  {}: Insufficient baseline data ({samples} files on {reference}, need 4+)",
            report.category
        ),
        BaselineStatus::NoSpread { samples } => writeln!(
            f,
            "  {}: No size spread in baseline ({samples} files on {reference})",
            report.category
        ),
        BaselineStatus::Checked {
            fences, outliers, ..
        } => {
            for o in outliers {
                let side = match o.direction {
                    Direction::Low => "Below lower",
                    Direction::High => "Above upper",
                };
                writeln!(f, "  OUTLIER: {} ({} tokens, {:+} vs baseline median)", o.path, o.tokens, o.deviation)?;
                writeln!(f, "    {side} fence: {:.0} tokens", o.fence)?;
                writeln!(
                    f,
                    "    Baseline: {} files, Q1={}, Q3={}",
                    fences.samples, fences.q1 as u64, fences.q3 as u64
                )?;
            }
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct ProviderRow<'a> {
    #[serde(flatten)]
    profile: &'a ProviderProfile,
    token_limit: u64,
    fallback: bool,
}

/// Print the effective provider table with computed limits.
pub fn print_providers(table: &ProviderTable, json: bool) -> Result<()> {
    let rows: Vec<ProviderRow> = table
        .profiles()
        .iter()
        .map(|profile| ProviderRow {
            profile,
            token_limit: table.token_limit(&profile.id),
            fallback: table.is_fallback(&profile.id),
        })
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    println!("Provider profiles (first match wins, fallback last):");
    for row in &rows {
        let p = row.profile;
        let patterns = if row.fallback {
            "(fallback)".to_string()
        } else {
            p.file_patterns.join(", ")
        };
        println!(
            "  {:<10} {:<20} {:>9} x {:>2}% = {:>6} tokens  {}",
            p.id, p.display_name, p.context_window_tokens, p.instruction_limit_pct, row.token_limit, patterns
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classification;
    use crate::stats::Fences;

    fn file(path: &str, tokens: u64, severity: Severity) -> Classification {
        Classification {
            path: path.to_string(),
            chars: tokens * 4,
            tokens,
            token_limit: 8000,
            provider: "default".to_string(),
            provider_name: "Default (Copilot)".to_string(),
            severity,
        }
    }

    fn groups() -> Vec<CategoryGroup> {
        vec![
            CategoryGroup {
                id: "prompt_files".to_string(),
                name: "Prompt Files".to_string(),
                files: vec![
                    file(".github/prompts/a.prompt.md", 100, Severity::Ok),
                    file(".github/prompts/b.prompt.md", 7000, Severity::Warning),
                ],
            },
            CategoryGroup {
                id: "custom_agents".to_string(),
                name: "Custom Agents".to_string(),
                files: vec![],
            },
            CategoryGroup {
                id: "multi_agent_workspace".to_string(),
                name: "Multi-Agent Workspace".to_string(),
                files: vec![file("CLAUDE.md", 9000, Severity::Error)],
            },
        ]
    }

    fn self_referential() -> OutlierAnalysis {
        OutlierAnalysis::SelfReferential {
            multiplier: 1.5,
            outliers: vec![],
        }
    }

    #[test]
    fn totals_and_counts() {
        let report = Report::new(groups(), vec![], self_referential());
        assert_eq!(report.total_files, 3);
        assert_eq!(report.total_tokens, 16_100);
        assert_eq!(report.errors, 1);
        assert_eq!(report.warnings, 1);
        assert!(!report.passed);
    }

    #[test]
    fn category_totals_sum_to_overall() {
        let report = Report::new(groups(), vec![], self_referential());
        let by_category: u64 = report.categories.iter().map(|g| g.total_tokens()).sum();
        assert_eq!(by_category, report.total_tokens);
    }

    #[test]
    fn warnings_alone_pass() {
        let mut g = groups();
        g.pop();
        let report = Report::new(g, vec![], self_referential());
        assert!(report.passed);
        assert_eq!(report.warnings, 1);
    }

    #[test]
    fn budget_error_fails_run() {
        let mut g = groups();
        g.pop();
        let budget = CategoryResult {
            category_id: "prompt_files".to_string(),
            category: "Prompt Files".to_string(),
            total_chars: 30_000,
            budget: 24_000,
            severity: Severity::Error,
        };
        let report = Report::new(g, vec![budget], self_referential());
        assert!(!report.passed);
        let text = report.to_string();
        assert!(text.contains("Category Budgets:"));
        assert!(text.contains("[ERR]  Prompt Files: 30000 / 24000 chars"));
    }

    #[test]
    fn text_lists_files_and_summary() {
        let report = Report::new(groups(), vec![], self_referential());
        let text = report.to_string();
        assert!(text.contains("\nPrompt Files:\n"));
        assert!(!text.contains("Custom Agents:"));
        assert!(text.contains("[WARN] .github/prompts/b.prompt.md"));
        assert!(text.contains("--- 7100 tokens (2 files)"));
        assert!(text.contains("[Default (Copilot)]"));
        assert!(text.contains("No outliers detected"));
        assert!(text.contains("Overall: 16100 tokens across 3 files"));
        assert!(text.contains("Summary: 1 error(s), 1 warning(s)"));
        assert!(text.contains("Validation failed!"));
    }

    #[test]
    fn text_reports_self_referential_outlier() {
        let outliers = OutlierAnalysis::SelfReferential {
            multiplier: 1.5,
            outliers: vec![Outlier {
                category: "Prompt Files".to_string(),
                path: ".github/prompts/b.prompt.md".to_string(),
                tokens: 7000,
                direction: Direction::High,
                fence: 500.0,
                deviation: 6900,
            }],
        };
        let text = Report::new(groups(), vec![], outliers).to_string();
        assert!(text.contains("IQR method, 1.5x multiplier"));
        assert!(text.contains("Prompt Files: .github/prompts/b.prompt.md (7000 tokens, +6900 vs median) [HIGH]"));
        assert!(!text.contains("No outliers detected"));
    }

    #[test]
    fn text_reports_baseline_statuses() {
        let fences = Fences {
            q1: 101.25,
            q3: 106.75,
            iqr: 5.5,
            lower: 93.0,
            upper: 115.0,
            samples: 8,
        };
        let outliers = OutlierAnalysis::Baseline {
            reference: "origin/main".to_string(),
            multiplier: 1.5,
            categories: vec![
                BaselineReport {
                    category_id: "prompt_files".to_string(),
                    category: "Prompt Files".to_string(),
                    status: BaselineStatus::Checked {
                        fences,
                        median: 104,
                        outliers: vec![Outlier {
                            category: "Prompt Files".to_string(),
                            path: ".github/prompts/b.prompt.md".to_string(),
                            tokens: 7000,
                            direction: Direction::High,
                            fence: 115.0,
                            deviation: 6896,
                        }],
                    },
                },
                BaselineReport {
                    category_id: "multi_agent_workspace".to_string(),
                    category: "Multi-Agent Workspace".to_string(),
                    status: BaselineStatus::Insufficient { samples: 1 },
                },
            ],
        };
        let text = Report::new(groups(), vec![], outliers).to_string();
        assert!(text.contains("Baseline comparison mode: comparing to origin/main"));
        assert!(text.contains("OUTLIER: .github/prompts/b.prompt.md (7000 tokens"));
        assert!(text.contains("Above upper fence: 115 tokens"));
        assert!(text.contains("Baseline: 8 files, Q1=101, Q3=106"));
        assert!(text.contains(
            "Multi-Agent Workspace: Insufficient baseline data (1 files on origin/main, need 4+)"
        ));
        assert!(!text.contains("No outliers in changed files"));
    }

    #[test]
    fn json_includes_mode_and_severity() {
        let report = Report::new(groups(), vec![], self_referential());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outliers"]["mode"], "self_referential");
        assert_eq!(json["categories"][2]["files"][0]["severity"], "error");
        assert_eq!(json["passed"], false);
    }
}
