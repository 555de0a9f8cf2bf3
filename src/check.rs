//! `context-health check`: discover, classify, budget-check and look for
//! outliers.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::category::CategoryGroup;
use crate::classify::{self, classify_category};
use crate::config::{self, Config};
use crate::git::{self, GitHistory, History};
use crate::measure;
use crate::outlier;
use crate::provider::ProviderTable;
use crate::report::{OutlierAnalysis, Report};

pub struct CheckOptions {
    pub root: PathBuf,
    pub config: Option<PathBuf>,
    /// Git ref to take the outlier baseline from.
    pub compare_to: Option<String>,
    /// Overrides `OUTLIER_IQR_MULTIPLIER`.
    pub iqr_multiplier: Option<f64>,
}

pub fn run(options: &CheckOptions) -> Result<Report> {
    if !options.root.is_dir() {
        anyhow::bail!("root is not a directory: {}", options.root.display());
    }
    let config_path = config::config_path(&options.root, options.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let multiplier = match options.iqr_multiplier {
        Some(k) => config::validate_multiplier(k)?,
        None => config.outlier_iqr_multiplier,
    };
    let history = GitHistory::new(&options.root);
    evaluate(
        &options.root,
        &config,
        options.compare_to.as_deref(),
        multiplier,
        &history,
    )
}

/// Run every check over `root`. `history` is only queried when `compare_to`
/// is set.
pub fn evaluate(
    root: &Path,
    config: &Config,
    compare_to: Option<&str>,
    multiplier: f64,
    history: &dyn History,
) -> Result<Report> {
    let providers = config.provider_table()?;
    let categories = config.categories()?;
    let thresholds = config.thresholds();

    let mut groups = Vec::with_capacity(categories.len());
    for category in &categories {
        let mut files = Vec::new();
        for rel in category.discover(root)? {
            let chars = measure::char_count(&root.join(&rel));
            let provider = providers.resolve(&rel);
            files.push(classify::classify(
                &rel,
                chars,
                provider,
                config.chars_per_token,
                thresholds,
            ));
        }
        tracing::debug!(category = category.id(), files = files.len(), "classified");
        groups.push(CategoryGroup {
            id: category.id().to_string(),
            name: category.name().to_string(),
            files,
        });
    }

    let budgets = groups
        .iter()
        .filter_map(|g| {
            let budget = config.budget_for(&g.id)?;
            Some(classify_category(&g.id, &g.name, g.total_chars(), budget, thresholds))
        })
        .collect();

    let outliers = match compare_to {
        None => OutlierAnalysis::SelfReferential {
            multiplier,
            outliers: outlier::detect_in_groups(&groups, multiplier),
        },
        Some(reference) => {
            let changed: BTreeSet<String> = history.changed_paths(reference).into_iter().collect();
            let baseline = git::baseline_sizes(history, reference, &categories)
                .map(|sizes| baseline_tokens(sizes, config));
            if baseline.is_none() {
                tracing::warn!(reference, "could not read reference tree, no baseline available");
            }
            OutlierAnalysis::Baseline {
                reference: reference.to_string(),
                multiplier,
                categories: outlier::detect_against_baseline(
                    &groups,
                    baseline.as_ref(),
                    &changed,
                    multiplier,
                ),
            }
        }
    };

    Ok(Report::new(groups, budgets, outliers))
}

// Baseline sizes arrive in characters; outliers are judged in tokens.
fn baseline_tokens(
    sizes: BTreeMap<String, Vec<(String, u64)>>,
    config: &Config,
) -> BTreeMap<String, Vec<u64>> {
    sizes
        .into_iter()
        .map(|(id, files)| {
            let tokens = files
                .into_iter()
                .map(|(_, chars)| measure::estimate_tokens(chars, config.chars_per_token))
                .collect();
            (id, tokens)
        })
        .collect()
}

/// Provider table for `context-health providers`: from the config when one
/// exists (or was named explicitly), otherwise the built-in table.
pub fn provider_table(root: &Path, explicit: Option<&Path>) -> Result<ProviderTable> {
    let path = config::config_path(root, explicit);
    if explicit.is_none() && !path.exists() {
        tracing::info!(path = %path.display(), "no configuration found, using built-in providers");
        return Ok(ProviderTable::builtin()?);
    }
    let config =
        Config::load(&path).with_context(|| format!("failed to load {}", path.display()))?;
    Ok(config.provider_table()?)
}
