//! Revision resolver backed by the `git` executable.
//!
//! Resolves two revision identifiers to commits, lists the source files that
//! differ between them (with rename detection), and reads both snapshots of a
//! file from the commits' tree objects. The working directory contents are never
//! read, so uncommitted edits do not influence the result.

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{CoreError, Result};
use crate::types::{FileChange, FileStatus};

/// Minimum similarity for a delete/add pair to count as a rename.
pub const RENAME_SIMILARITY: u8 = 50;

/// A changed path before its snapshots are loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangedPath {
    pub path: String,
    pub previous_path: Option<String>,
    pub status: FileStatus,
}

/// Git-backed resolver rooted at a repository's top-level directory.
#[derive(Clone, Debug)]
pub struct RevisionResolver {
    root: PathBuf,
    extension: String,
}

impl RevisionResolver {
    /// Locate the repository containing `tree`.
    pub fn open(tree: &Path, extension: &str) -> Result<Self> {
        if !tree.is_dir() {
            return Err(CoreError::NotARepository {
                path: tree.display().to_string(),
            });
        }

        let output = spawn_git(tree, &["rev-parse", "--show-toplevel"])?;
        if !output.status.success() {
            return Err(CoreError::NotARepository {
                path: tree.display().to_string(),
            });
        }

        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!("Repository root: {}", root);

        Ok(Self {
            root: PathBuf::from(root),
            extension: extension.trim_start_matches('.').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a revision identifier to a full commit id.
    pub fn resolve(&self, revision: &str) -> Result<String> {
        let spec = format!("{}^{{commit}}", revision);
        let output = spawn_git(&self.root, &["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.status.success() {
            return Err(CoreError::UnknownRevision {
                revision: revision.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// List source files that differ between two commits, without their contents.
    pub fn changed_files(&self, base: &str, head: &str) -> Result<Vec<ChangedPath>> {
        let rename_flag = format!("-M{}%", RENAME_SIMILARITY);
        let stdout = run_git(
            &self.root,
            &["diff", "--name-status", "-z", &rename_flag, base, head, "--"],
        )?;

        let entries = parse_name_status(&String::from_utf8_lossy(&stdout));
        Ok(restrict_to_extension(entries, &self.extension))
    }

    /// Read a file's text from a commit's tree.
    pub fn read_blob(&self, commit: &str, path: &str) -> std::result::Result<String, String> {
        let object = format!("{}:{}", commit, path);
        let output = spawn_git(&self.root, &["cat-file", "blob", &object])
            .map_err(|e| e.to_string())?;

        if !output.status.success() {
            return Err(format!(
                "cannot read {}: {}",
                object,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        String::from_utf8(output.stdout).map_err(|_| format!("{} is not valid UTF-8", object))
    }

    /// Attach both snapshots to a changed path. Unreadable blobs are recorded, not raised.
    pub fn load(&self, base: &str, head: &str, entry: &ChangedPath) -> FileChange {
        let old_path = entry.previous_path.as_deref().unwrap_or(&entry.path);
        let mut unreadable = None;

        let mut read = |commit: &str, path: &str| match self.read_blob(commit, path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("{}", e);
                unreadable.get_or_insert(e);
                None
            }
        };

        let (old_text, new_text) = match entry.status {
            FileStatus::Added => (None, read(head, &entry.path)),
            FileStatus::Deleted => (read(base, &entry.path), None),
            FileStatus::Modified | FileStatus::Renamed => {
                let old = read(base, old_path);
                let new = read(head, &entry.path);
                (old, new)
            }
        };

        FileChange {
            path: entry.path.clone(),
            previous_path: entry.previous_path.clone(),
            status: entry.status,
            old_text,
            new_text,
            unreadable,
        }
    }

    /// Resolve both revisions and load every changed source file.
    pub fn diff(&self, base_rev: &str, head_rev: &str) -> Result<Vec<FileChange>> {
        let base = self.resolve(base_rev)?;
        let head = self.resolve(head_rev)?;
        let entries = self.changed_files(&base, &head)?;

        Ok(entries
            .par_iter()
            .map(|entry| self.load(&base, &head, entry))
            .collect())
    }
}

fn spawn_git(cwd: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .current_dir(cwd)
        .args(args)
        .output()
        .map_err(|e| CoreError::GitUnavailable {
            message: e.to_string(),
        })
}

/// Run git and return raw stdout, mapping a non-zero exit to [`CoreError::Git`].
fn run_git(cwd: &Path, args: &[&str]) -> Result<Vec<u8>> {
    let output = spawn_git(cwd, args)?;
    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(CoreError::Git {
            command: args.first().unwrap_or(&"").to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Parse `git diff --name-status -z` output.
///
/// Records are NUL separated: a status field followed by one path, or by two
/// paths for renames (`R<score>`) and copies (`C<score>`).
fn parse_name_status(output: &str) -> Vec<ChangedPath> {
    let mut fields = output.split('\0').filter(|f| !f.is_empty());
    let mut entries = Vec::new();

    while let Some(status) = fields.next() {
        let code = status.chars().next().unwrap_or(' ');
        match code {
            'R' | 'C' => {
                let (Some(from), Some(to)) = (fields.next(), fields.next()) else {
                    break;
                };
                if code == 'R' {
                    entries.push(ChangedPath {
                        path: to.to_string(),
                        previous_path: Some(from.to_string()),
                        status: FileStatus::Renamed,
                    });
                } else {
                    entries.push(ChangedPath {
                        path: to.to_string(),
                        previous_path: None,
                        status: FileStatus::Added,
                    });
                }
            }
            _ => {
                let Some(path) = fields.next() else {
                    break;
                };
                let status = match code {
                    'A' => FileStatus::Added,
                    'D' => FileStatus::Deleted,
                    'M' | 'T' => FileStatus::Modified,
                    _ => {
                        tracing::debug!("Skipping {} with status {}", path, status);
                        continue;
                    }
                };
                entries.push(ChangedPath {
                    path: path.to_string(),
                    previous_path: None,
                    status,
                });
            }
        }
    }

    entries
}

/// Keep source files only. A rename across the extension boundary degrades to
/// the half that is still a source file.
fn restrict_to_extension(entries: Vec<ChangedPath>, extension: &str) -> Vec<ChangedPath> {
    let is_source = |path: &str| {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == extension)
            .unwrap_or(false)
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let to_source = is_source(&entry.path);
            match entry.previous_path.as_deref().map(|p| is_source(p)) {
                None => to_source.then_some(entry),
                Some(from_source) => match (from_source, to_source) {
                    (true, true) => Some(entry),
                    (true, false) => Some(ChangedPath {
                        path: entry.previous_path.unwrap_or_default(),
                        previous_path: None,
                        status: FileStatus::Deleted,
                    }),
                    (false, true) => Some(ChangedPath {
                        path: entry.path,
                        previous_path: None,
                        status: FileStatus::Added,
                    }),
                    (false, false) => None,
                },
            }
        })
        .collect()
}
