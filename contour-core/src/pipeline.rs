//! End-to-end analysis: resolve, filter, extract, diff, assemble.

use rayon::prelude::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::differ::diff_trees;
use crate::error::{CoreError, Result};
use crate::parser::{check_grammar, extract_optional};
use crate::report::{assemble, ChangeReport, FileAnalysis};
use crate::revision::{ChangedPath, RevisionResolver};
use crate::scope::ScopeFilter;
use crate::types::FileChange;

/// Inputs of one analysis run.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    /// Any directory inside the repository.
    pub root: PathBuf,
    pub base: String,
    pub head: String,
    pub scope: ScopeFilter,
    /// Wall-clock budget for the whole run.
    pub deadline: Option<Duration>,
    /// Worker threads, `None` for one per core.
    pub num_threads: Option<usize>,
}

impl AnalysisRequest {
    pub fn new(root: impl Into<PathBuf>, base: impl Into<String>, head: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base: base.into(),
            head: head.into(),
            scope: ScopeFilter::default(),
            deadline: None,
            num_threads: None,
        }
    }

    pub fn with_scope(mut self, scope: ScopeFilter) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }
}

struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    fn check(&self) -> Result<()> {
        match self.limit {
            Some(limit) if self.started.elapsed() > limit => Err(CoreError::DeadlineExceeded {
                seconds: limit.as_secs(),
            }),
            _ => Ok(()),
        }
    }
}

/// Run the full analysis and return the report.
///
/// Configuration-class failures abort the run. Files that cannot be read or
/// parsed become unanalyzable entries in the report instead.
pub fn analyze(request: &AnalysisRequest) -> Result<ChangeReport> {
    let deadline = Deadline {
        started: Instant::now(),
        limit: request.deadline,
    };

    tracing::info!(
        "Analyzing {}..{} in {}",
        request.base,
        request.head,
        request.root.display()
    );

    check_grammar()?;
    let resolver = RevisionResolver::open(&request.root, request.scope.extension())?;
    let base = resolver.resolve(&request.base)?;
    let head = resolver.resolve(&request.head)?;

    let entries: Vec<ChangedPath> = resolver
        .changed_files(&base, &head)?
        .into_iter()
        .filter(|entry| {
            let included = request.scope.is_included(&entry.path);
            if !included {
                tracing::debug!("Out of scope: {}", entry.path);
            }
            included
        })
        .collect();

    tracing::debug!("{} changed file(s) in scope", entries.len());
    deadline.check()?;

    let process = |entry: &ChangedPath| -> Result<(FileChange, FileAnalysis)> {
        deadline.check()?;
        let change = resolver.load(&base, &head, entry);
        let analysis = analyze_file(&change);
        Ok((change, analysis))
    };

    let pool = match request.num_threads {
        Some(n) if n > 0 => rayon::ThreadPoolBuilder::new().num_threads(n).build().ok(),
        _ => None,
    };

    let results: Vec<(FileChange, FileAnalysis)> = match pool {
        Some(pool) => pool.install(|| entries.par_iter().map(process).collect::<Result<_>>())?,
        None => entries.par_iter().map(process).collect::<Result<_>>()?,
    };
    deadline.check()?;

    let (changes, analyses): (Vec<FileChange>, Vec<FileAnalysis>) = results.into_iter().unzip();
    let report = assemble(&changes, analyses);

    tracing::info!(
        "Analysis finished in {:?}: {}",
        deadline.started.elapsed(),
        report.summary().text()
    );

    Ok(report)
}

/// Extract both snapshots of one file and diff them.
pub fn analyze_file(change: &FileChange) -> FileAnalysis {
    if let Some(reason) = &change.unreadable {
        return FileAnalysis::Unanalyzable(reason.clone());
    }

    let old_path = change.previous_path.as_deref().unwrap_or(&change.path);
    let old = match extract_optional(change.old_text.as_deref(), old_path) {
        Ok(tree) => tree,
        Err(failure) => {
            tracing::warn!("Cannot parse base snapshot: {}", failure);
            return FileAnalysis::Unanalyzable(format!("base snapshot: {}", failure));
        }
    };
    let new = match extract_optional(change.new_text.as_deref(), &change.path) {
        Ok(tree) => tree,
        Err(failure) => {
            tracing::warn!("Cannot parse head snapshot: {}", failure);
            return FileAnalysis::Unanalyzable(format!("head snapshot: {}", failure));
        }
    };

    let diffs = diff_trees(&old, &new);
    tracing::debug!(
        "{} [{}]: {} top-level change(s)",
        change.path,
        change.status.code(),
        diffs.len()
    );
    FileAnalysis::Diffed(diffs)
}
