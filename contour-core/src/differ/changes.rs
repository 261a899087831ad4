//! Change types and result structures for structural diff.

use serde::{Deserialize, Serialize};

use crate::types::DeclKind;

/// How a declaration changed between two snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Added,
    Removed,
    ModifiedSignature,
    ModifiedBody,
    Unchanged,
}

impl DiffKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffKind::Added => "added",
            DiffKind::Removed => "removed",
            DiffKind::ModifiedSignature => "modified_signature",
            DiffKind::ModifiedBody => "modified_body",
            DiffKind::Unchanged => "unchanged",
        }
    }

    pub fn is_modified(&self) -> bool {
        matches!(self, DiffKind::ModifiedSignature | DiffKind::ModifiedBody)
    }

    /// Kind seen when the two snapshots are swapped.
    pub fn inverse(&self) -> Self {
        match self {
            DiffKind::Added => DiffKind::Removed,
            DiffKind::Removed => DiffKind::Added,
            other => *other,
        }
    }
}

/// Diff entry for one declaration, with its changed members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationDiff {
    pub kind: DeclKind,
    pub name: String,
    pub change: DiffKind,
    /// Changed members only. An `Unchanged` container is kept when this is non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<DeclarationDiff>,
}

impl DeclarationDiff {
    pub fn new(kind: DeclKind, name: impl Into<String>, change: DiffKind) -> Self {
        Self {
            kind,
            name: name.into(),
            change,
            nested: Vec::new(),
        }
    }

    /// Set nested member diffs.
    pub fn with_nested(mut self, nested: Vec<DeclarationDiff>) -> Self {
        self.nested = nested;
        self
    }

    /// Whether this entry or any descendant is a real change.
    pub fn has_change(&self) -> bool {
        self.change != DiffKind::Unchanged || self.nested.iter().any(|d| d.has_change())
    }

    /// Names of changed direct members, deduplicated in first-seen order.
    pub fn changed_member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for member in &self.nested {
            if member.has_change() && !names.contains(&member.name) {
                names.push(member.name.clone());
            }
        }
        names
    }

    /// Visit this entry and all descendants depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a DeclarationDiff)) {
        visit(self);
        for member in &self.nested {
            member.walk(visit);
        }
    }
}

/// Declaration-level change counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: u32,
    pub removed: u32,
    pub modified_signature: u32,
    pub modified_body: u32,
}

impl DiffSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every non-unchanged entry in `diffs`, nested ones included.
    pub fn from_diffs(diffs: &[DeclarationDiff]) -> Self {
        let mut summary = Self::new();
        for diff in diffs {
            diff.walk(&mut |d| summary.record(d.change));
        }
        summary
    }

    pub fn record(&mut self, change: DiffKind) {
        match change {
            DiffKind::Added => self.added += 1,
            DiffKind::Removed => self.removed += 1,
            DiffKind::ModifiedSignature => self.modified_signature += 1,
            DiffKind::ModifiedBody => self.modified_body += 1,
            DiffKind::Unchanged => {}
        }
    }

    pub fn merge(&mut self, other: &DiffSummary) {
        self.added += other.added;
        self.removed += other.removed;
        self.modified_signature += other.modified_signature;
        self.modified_body += other.modified_body;
    }

    pub fn modified(&self) -> u32 {
        self.modified_signature + self.modified_body
    }

    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.modified() == 0
    }

    /// Generate human-readable summary string.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        if self.added > 0 {
            parts.push(format!("{} added", self.added));
        }
        if self.removed > 0 {
            parts.push(format!("{} removed", self.removed));
        }
        if self.modified() > 0 {
            parts.push(format!(
                "{} modified ({} signature, {} body)",
                self.modified(),
                self.modified_signature,
                self.modified_body
            ));
        }

        if parts.is_empty() {
            "No declaration changes".to_string()
        } else {
            format!("declarations: {}", parts.join(", "))
        }
    }
}
