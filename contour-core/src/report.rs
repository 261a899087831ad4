//! Change report assembly.
//!
//! The report is a JSON array with one entry per changed source file. Added and
//! deleted files list every declaration they carry; modified and renamed files
//! list only the declarations whose structure changed and are dropped entirely
//! when nothing did.

use serde::{Deserialize, Serialize};

use crate::differ::{DeclarationDiff, DiffSummary};
use crate::types::{DeclKind, FileChange, FileStatus};

/// Outcome of analyzing one changed file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileAnalysis {
    /// Top-level diffs. For added and deleted files every declaration is present.
    Diffed(Vec<DeclarationDiff>),
    /// A snapshot could not be read or parsed.
    Unanalyzable(String),
}

/// A container (or top-level struct/enum) and the names of its changed members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeclKind,
    pub methods: Vec<String>,
}

/// Report entry for one changed file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub file: String,
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contracts: Option<Vec<ContractEntry>>,
    /// Changed file-level functions and events.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub declarations: DiffSummary,
}

impl FileReport {
    /// Build the entry for an analyzed file, or `None` when a modified file has no
    /// structural change.
    pub fn from_diffs(change: &FileChange, diffs: &[DeclarationDiff]) -> Option<Self> {
        let listed = matches!(change.status, FileStatus::Added | FileStatus::Deleted);
        if !listed && diffs.is_empty() {
            return None;
        }

        let mut contracts = Vec::new();
        let mut functions: Vec<String> = Vec::new();

        for diff in diffs {
            if diff.kind.is_container() {
                contracts.push(ContractEntry {
                    name: diff.name.clone(),
                    kind: diff.kind,
                    methods: diff.changed_member_names(),
                });
            } else if !functions.contains(&diff.name) {
                functions.push(diff.name.clone());
            }
        }

        Some(Self {
            file: change.path.clone(),
            status: change.status,
            previous_file: change.previous_path.clone(),
            contracts: Some(contracts),
            functions,
            error: None,
            declarations: DiffSummary::from_diffs(diffs),
        })
    }

    pub fn unanalyzable(change: &FileChange, message: impl Into<String>) -> Self {
        Self {
            file: change.path.clone(),
            status: change.status,
            previous_file: change.previous_path.clone(),
            contracts: None,
            functions: Vec::new(),
            error: Some(message.into()),
            declarations: DiffSummary::default(),
        }
    }

    pub fn is_unanalyzable(&self) -> bool {
        self.error.is_some()
    }

    pub fn contract_names(&self) -> Vec<&str> {
        self.contracts
            .iter()
            .flatten()
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Ordered per-file entries. Serializes as a bare JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeReport {
    pub files: Vec<FileReport>,
}

impl ChangeReport {
    pub fn new(files: Vec<FileReport>) -> Self {
        Self { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn find(&self, file: &str) -> Option<&FileReport> {
        self.files.iter().find(|f| f.file == file)
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary::from_files(&self.files)
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// Counts derived from a report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub files_added: u32,
    pub files_modified: u32,
    pub files_deleted: u32,
    pub files_renamed: u32,
    pub unanalyzable: u32,
    pub declarations: DiffSummary,
}

impl ReportSummary {
    pub fn from_files(files: &[FileReport]) -> Self {
        let mut summary = Self::default();
        for file in files {
            match file.status {
                FileStatus::Added => summary.files_added += 1,
                FileStatus::Modified => summary.files_modified += 1,
                FileStatus::Deleted => summary.files_deleted += 1,
                FileStatus::Renamed => summary.files_renamed += 1,
            }
            if file.is_unanalyzable() {
                summary.unanalyzable += 1;
            }
            summary.declarations.merge(&file.declarations);
        }
        summary
    }

    pub fn total_files(&self) -> u32 {
        self.files_added + self.files_modified + self.files_deleted + self.files_renamed
    }

    /// Generate human-readable summary string.
    pub fn text(&self) -> String {
        if self.total_files() == 0 {
            return "No structural changes".to_string();
        }

        let mut parts = Vec::new();
        for (count, label) in [
            (self.files_added, "added"),
            (self.files_modified, "modified"),
            (self.files_deleted, "deleted"),
            (self.files_renamed, "renamed"),
        ] {
            if count > 0 {
                parts.push(format!("{} {}", count, label));
            }
        }

        let mut text = format!(
            "{} file{} changed ({})",
            self.total_files(),
            if self.total_files() == 1 { "" } else { "s" },
            parts.join(", ")
        );
        if self.unanalyzable > 0 {
            text.push_str(&format!(", {} unanalyzable", self.unanalyzable));
        }
        if !self.declarations.is_empty() {
            text.push_str("; ");
            text.push_str(&self.declarations.text());
        }
        text
    }
}

/// Combine per-file outcomes into the report, keeping the order of `changes`.
pub fn assemble(changes: &[FileChange], analyses: Vec<FileAnalysis>) -> ChangeReport {
    let files = changes
        .iter()
        .zip(analyses)
        .filter_map(|(change, analysis)| match analysis {
            FileAnalysis::Diffed(diffs) => FileReport::from_diffs(change, &diffs),
            FileAnalysis::Unanalyzable(message) => Some(FileReport::unanalyzable(change, message)),
        })
        .collect();

    ChangeReport::new(files)
}
