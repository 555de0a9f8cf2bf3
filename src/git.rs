//! Read-only access to git history for baseline comparison.
//!
//! Every query degrades to an empty or `None` result on failure: a missing
//! ref or a machine without git means "no baseline", never an aborted run.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::category::Category;
use crate::measure;

/// The three history queries baseline comparison needs. Paths are relative
/// to the scan root and use forward slashes.
pub trait History {
    /// Paths that differ between `reference` and the working copy, including
    /// untracked files.
    fn changed_paths(&self, reference: &str) -> Vec<String>;
    /// Every file tracked at `reference`, or `None` if the ref can't be listed.
    fn list_files(&self, reference: &str) -> Option<Vec<String>>;
    /// Content of `path` at `reference`.
    fn read_file(&self, reference: &str, path: &str) -> Option<String>;
}

/// [`History`] backed by the `git` CLI, run from the scan root.
#[derive(Debug, Clone)]
pub struct GitHistory {
    root: PathBuf,
}

impl GitHistory {
    pub fn new(root: &Path) -> Self {
        GitHistory {
            root: root.to_path_buf(),
        }
    }

    /// Run git and return stdout, or `None` on spawn failure or non-zero exit.
    fn git(&self, args: &[&str]) -> Option<Vec<u8>> {
        let output = match Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                tracing::debug!(?args, error = %err, "failed to run git");
                return None;
            }
        };
        if !output.status.success() {
            tracing::debug!(
                ?args,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git exited with {}",
                output.status
            );
            return None;
        }
        Some(output.stdout)
    }

    fn git_paths(&self, args: &[&str]) -> Option<Vec<String>> {
        let stdout = self.git(args)?;
        Some(
            stdout
                .split(|&b| b == 0)
                .filter(|p| !p.is_empty())
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .collect(),
        )
    }
}

// A ref starting with `-` would be parsed as an option.
fn usable_ref(reference: &str) -> bool {
    if reference.is_empty() || reference.starts_with('-') {
        tracing::warn!(reference, "ignoring unusable git ref");
        return false;
    }
    true
}

impl History for GitHistory {
    fn changed_paths(&self, reference: &str) -> Vec<String> {
        if !usable_ref(reference) {
            return Vec::new();
        }
        let mut changed = BTreeSet::new();
        if let Some(paths) = self.git_paths(&["diff", "--name-only", "--relative", "-z", reference, "--"]) {
            changed.extend(paths);
        }
        if let Some(paths) = self.git_paths(&["ls-files", "--others", "--exclude-standard", "-z"]) {
            changed.extend(paths);
        }
        changed.into_iter().collect()
    }

    fn list_files(&self, reference: &str) -> Option<Vec<String>> {
        if !usable_ref(reference) {
            return None;
        }
        self.git_paths(&["ls-tree", "-r", "-z", "--name-only", reference])
    }

    fn read_file(&self, reference: &str, path: &str) -> Option<String> {
        if !usable_ref(reference) {
            return None;
        }
        let stdout = self.git(&["show", &format!("{reference}:./{path}")])?;
        match String::from_utf8(stdout) {
            Ok(content) => Some(content),
            Err(_) => {
                tracing::debug!(reference, path, "skipping non-UTF-8 baseline file");
                None
            }
        }
    }
}

/// Per category id, the `(path, chars)` of every matching file at
/// `reference`. `None` when the reference tree can't be listed.
pub fn baseline_sizes(
    history: &dyn History,
    reference: &str,
    categories: &[Category],
) -> Option<BTreeMap<String, Vec<(String, u64)>>> {
    let listing = history.list_files(reference)?;
    let mut baseline = BTreeMap::new();
    for category in categories {
        let mut sizes = Vec::new();
        for path in listing.iter().filter(|p| category.matches(p)) {
            if let Some(content) = history.read_file(reference, path) {
                sizes.push((path.clone(), measure::count_chars(&content)));
            }
        }
        tracing::debug!(category = category.id(), files = sizes.len(), "baseline collected");
        baseline.insert(category.id().to_string(), sizes);
    }
    Some(baseline)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::category::CategorySpec;
    use std::collections::HashMap;

    /// In-memory history: one reference tree plus a changed-path list.
    #[derive(Default)]
    pub(crate) struct FakeHistory {
        pub files: HashMap<String, String>,
        pub changed: Vec<String>,
        pub unavailable: bool,
    }

    impl History for FakeHistory {
        fn changed_paths(&self, _reference: &str) -> Vec<String> {
            self.changed.clone()
        }

        fn list_files(&self, _reference: &str) -> Option<Vec<String>> {
            if self.unavailable {
                return None;
            }
            let mut paths: Vec<_> = self.files.keys().cloned().collect();
            paths.sort();
            Some(paths)
        }

        fn read_file(&self, _reference: &str, path: &str) -> Option<String> {
            self.files.get(path).cloned()
        }
    }

    fn categories() -> Vec<Category> {
        CategorySpec::builtin()
            .into_iter()
            .map(|s| Category::new(s).unwrap())
            .collect()
    }

    #[test]
    fn baseline_groups_by_category() {
        let mut history = FakeHistory::default();
        history.files.insert(".github/prompts/a.prompt.md".into(), "a".repeat(40));
        history.files.insert(".github/prompts/b.prompt.md".into(), "世".repeat(8));
        history.files.insert("CLAUDE.md".into(), "c".repeat(12));
        history.files.insert("src/main.rs".into(), "fn main() {}".into());

        let baseline = baseline_sizes(&history, "origin/main", &categories()).unwrap();
        assert_eq!(
            baseline["prompt_files"],
            vec![
                (".github/prompts/a.prompt.md".to_string(), 40),
                (".github/prompts/b.prompt.md".to_string(), 8),
            ]
        );
        assert_eq!(baseline["multi_agent_workspace"], vec![("CLAUDE.md".to_string(), 12)]);
        assert!(baseline["custom_agents"].is_empty());
    }

    #[test]
    fn unlistable_reference_yields_none() {
        let history = FakeHistory {
            unavailable: true,
            ..FakeHistory::default()
        };
        assert!(baseline_sizes(&history, "origin/main", &categories()).is_none());
    }

    #[test]
    fn option_like_refs_are_refused() {
        let git = GitHistory::new(Path::new("."));
        assert!(git.changed_paths("--output=/tmp/x").is_empty());
        assert!(git.list_files("-h").is_none());
        assert!(git.read_file("", "CLAUDE.md").is_none());
    }

    #[test]
    fn outside_a_repository_everything_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitHistory::new(dir.path());
        assert!(git.changed_paths("origin/main").is_empty());
        assert!(git.list_files("origin/main").is_none());
        assert!(git.read_file("origin/main", "CLAUDE.md").is_none());
    }

    fn run_git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
            .args(["-c", "commit.gpgsign=false", "-c", "core.autocrlf=false"])
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    /// A repo with `main` committed, then one tracked edit at the top level,
    /// one inside `pkg/`, an untracked file and an ignored file.
    fn repo_with_changes() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        run_git(root, &["init", "-q"]);
        write(root, ".gitignore", "*.log\n");
        write(root, "TOP.md", "top");
        write(root, "pkg/CLAUDE.md", "hello");
        write(root, "pkg/.github/prompts/a.prompt.md", "x\r\ny");
        run_git(root, &["add", "-A"]);
        run_git(root, &["commit", "-q", "-m", "init"]);
        run_git(root, &["branch", "-M", "main"]);

        write(root, "TOP.md", "top, edited");
        write(root, "pkg/CLAUDE.md", "hello, edited");
        write(root, "pkg/new.md", "untracked");
        write(root, "pkg/debug.log", "ignored");
        dir
    }

    #[test]
    fn scan_root_subdirectory_sees_relative_paths() {
        let dir = repo_with_changes();
        let git = GitHistory::new(&dir.path().join("pkg"));

        assert_eq!(git.changed_paths("main"), vec!["CLAUDE.md", "new.md"]);
        assert_eq!(
            git.list_files("main"),
            Some(vec![
                ".github/prompts/a.prompt.md".to_string(),
                "CLAUDE.md".to_string(),
            ])
        );
        assert_eq!(git.read_file("main", "CLAUDE.md").as_deref(), Some("hello"));
        assert_eq!(
            git.read_file("main", ".github/prompts/a.prompt.md").as_deref(),
            Some("x\r\ny")
        );
        assert!(git.read_file("main", "new.md").is_none());
    }

    #[test]
    fn repository_root_sees_every_change() {
        let dir = repo_with_changes();
        let git = GitHistory::new(dir.path());

        assert_eq!(
            git.changed_paths("main"),
            vec!["TOP.md", "pkg/CLAUDE.md", "pkg/new.md"]
        );
        assert_eq!(
            git.list_files("main"),
            Some(vec![
                ".gitignore".to_string(),
                "TOP.md".to_string(),
                "pkg/.github/prompts/a.prompt.md".to_string(),
                "pkg/CLAUDE.md".to_string(),
            ])
        );
        assert_eq!(git.read_file("main", "pkg/CLAUDE.md").as_deref(), Some("hello"));
        assert!(git.list_files("no-such-branch").is_none());
    }

    #[test]
    fn baseline_sizes_from_real_repository() {
        let dir = repo_with_changes();
        let git = GitHistory::new(&dir.path().join("pkg"));
        let baseline = baseline_sizes(&git, "main", &categories()).unwrap();
        assert_eq!(baseline["multi_agent_workspace"], vec![("CLAUDE.md".to_string(), 5)]);
        // Committed with CRLF: counted like its LF equivalent.
        assert_eq!(
            baseline["prompt_files"],
            vec![(".github/prompts/a.prompt.md".to_string(), 3)]
        );
    }
}
