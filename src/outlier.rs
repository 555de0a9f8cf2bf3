//! Outlier detection over category groups, either against the group's own
//! sizes or against a baseline from a reference revision.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::category::CategoryGroup;
use crate::stats::{self, Direction, Fences, MIN_SAMPLES};

/// A file whose size falls outside its category's fences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outlier {
    pub category: String,
    pub path: String,
    pub tokens: u64,
    pub direction: Direction,
    /// The fence that was crossed.
    pub fence: f64,
    /// `tokens` minus the comparison median.
    pub deviation: i64,
}

fn deviation(tokens: u64, median: u64) -> i64 {
    tokens as i64 - median as i64
}

/// Flag files against fences computed from their own category. Categories
/// with fewer than four files are skipped.
pub fn detect_in_groups(groups: &[CategoryGroup], multiplier: f64) -> Vec<Outlier> {
    let mut outliers = Vec::new();
    for group in groups {
        if group.files.len() < MIN_SAMPLES {
            continue;
        }
        let sizes = group.token_sizes();
        let (Some(fences), Some(median)) = (
            stats::compute_fences(&sizes, multiplier),
            stats::median(&sizes),
        ) else {
            continue;
        };
        let found = stats::detect_outliers(&sizes, multiplier);
        let flagged = found
            .lower
            .iter()
            .map(|&i| (i, Direction::Low, fences.lower))
            .chain(found.upper.iter().map(|&i| (i, Direction::High, fences.upper)));
        for (i, direction, fence) in flagged {
            let file = &group.files[i];
            outliers.push(Outlier {
                category: group.name.clone(),
                path: file.path.clone(),
                tokens: file.tokens,
                direction,
                fence,
                deviation: deviation(file.tokens, median),
            });
        }
    }
    outliers
}

/// Outcome of comparing one category against the reference revision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BaselineStatus {
    /// The reference revision could not be read.
    Unavailable,
    /// Fewer than four files at the reference revision.
    Insufficient { samples: usize },
    /// Enough files, but all quartiles coincide.
    NoSpread { samples: usize },
    Checked {
        fences: Fences,
        median: u64,
        outliers: Vec<Outlier>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineReport {
    pub category_id: String,
    pub category: String,
    #[serde(flatten)]
    pub status: BaselineStatus,
}

/// Flag changed files whose current size is outside fences computed from
/// the reference sizes of their category. `baseline` maps category id to
/// reference token sizes; `None` means history was unavailable. Only
/// categories with current files are reported.
pub fn detect_against_baseline(
    groups: &[CategoryGroup],
    baseline: Option<&BTreeMap<String, Vec<u64>>>,
    changed: &BTreeSet<String>,
    multiplier: f64,
) -> Vec<BaselineReport> {
    let mut reports = Vec::new();
    for group in groups.iter().filter(|g| !g.files.is_empty()) {
        let status = match baseline {
            None => BaselineStatus::Unavailable,
            Some(baseline) => {
                let reference = baseline.get(&group.id).map(Vec::as_slice).unwrap_or(&[]);
                check_group(group, reference, changed, multiplier)
            }
        };
        reports.push(BaselineReport {
            category_id: group.id.clone(),
            category: group.name.clone(),
            status,
        });
    }
    reports
}

fn check_group(
    group: &CategoryGroup,
    reference: &[u64],
    changed: &BTreeSet<String>,
    multiplier: f64,
) -> BaselineStatus {
    let samples = reference.len();
    if samples < MIN_SAMPLES {
        return BaselineStatus::Insufficient { samples };
    }
    let (Some(fences), Some(median)) = (
        stats::compute_fences(reference, multiplier),
        stats::median(reference),
    ) else {
        return BaselineStatus::NoSpread { samples };
    };
    let outliers = group
        .files
        .iter()
        .filter(|f| changed.contains(&f.path))
        .filter_map(|f| {
            let direction = fences.outside(f.tokens)?;
            let fence = match direction {
                Direction::Low => fences.lower,
                Direction::High => fences.upper,
            };
            Some(Outlier {
                category: group.name.clone(),
                path: f.path.clone(),
                tokens: f.tokens,
                direction,
                fence,
                deviation: deviation(f.tokens, median),
            })
        })
        .collect();
    BaselineStatus::Checked {
        fences,
        median,
        outliers,
    }
}
