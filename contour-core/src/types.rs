//! Data models for extracted declarations and resolved file changes.
//!
//! Declarations of a single source snapshot live in a [`DeclarationTree`] arena and
//! reference their members through [`DeclId`] handles, so a tree is cheap to clone
//! and compare and never owns cycles.

use serde::{Deserialize, Serialize};

/// Kind of a Solidity declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Contract,
    Interface,
    Library,
    Struct,
    Enum,
    Function,
    Modifier,
    Event,
}

impl DeclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Contract => "contract",
            DeclKind::Interface => "interface",
            DeclKind::Library => "library",
            DeclKind::Struct => "struct",
            DeclKind::Enum => "enum",
            DeclKind::Function => "function",
            DeclKind::Modifier => "modifier",
            DeclKind::Event => "event",
        }
    }

    /// Kinds that may own member declarations.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            DeclKind::Contract
                | DeclKind::Interface
                | DeclKind::Library
                | DeclKind::Struct
                | DeclKind::Enum
        )
    }
}

/// Handle into a [`DeclarationTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Source location of a declaration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    /// 1-based
    pub start_line: u32,
    /// 1-based, inclusive
    pub end_line: u32,
}

/// A single extracted declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    /// Normalized header: tokens outside the body, comments dropped, single-space joined.
    pub signature: String,
    /// xxh3 of the normalized body tokens, if the declaration has a body.
    pub body_hash: Option<u64>,
    pub span: Span,
    /// Members in source order (container kinds only).
    pub members: Vec<DeclId>,
}

/// Two sibling declarations sharing one (kind, name) identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ambiguity {
    pub kind: DeclKind,
    pub name: String,
    /// Enclosing container name, `None` at file level.
    pub scope: Option<String>,
    pub first_line: u32,
    pub duplicate_line: u32,
}

/// Arena of declarations extracted from one source snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationTree {
    nodes: Vec<Declaration>,
    roots: Vec<DeclId>,
    ambiguities: Vec<Ambiguity>,
}

impl DeclarationTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a declaration and return its handle. The caller links it as a root or member.
    pub fn alloc(&mut self, decl: Declaration) -> DeclId {
        let id = DeclId(self.nodes.len() as u32);
        self.nodes.push(decl);
        id
    }

    pub fn push_root(&mut self, id: DeclId) {
        self.roots.push(id);
    }

    pub fn push_member(&mut self, parent: DeclId, member: DeclId) {
        self.nodes[parent.index()].members.push(member);
    }

    pub fn record_ambiguity(&mut self, ambiguity: Ambiguity) {
        self.ambiguities.push(ambiguity);
    }

    pub fn get(&self, id: DeclId) -> &Declaration {
        &self.nodes[id.index()]
    }

    /// Top-level declarations in source order.
    pub fn roots(&self) -> &[DeclId] {
        &self.roots
    }

    pub fn members(&self, id: DeclId) -> &[DeclId] {
        &self.get(id).members
    }

    pub fn ambiguities(&self) -> &[Ambiguity] {
        &self.ambiguities
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a top-level declaration by name.
    pub fn find_root(&self, name: &str) -> Option<&Declaration> {
        self.roots
            .iter()
            .map(|id| self.get(*id))
            .find(|d| d.name == name)
    }
}

/// Change status of a file between two revisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    #[serde(rename = "A")]
    Added,
    #[serde(rename = "M")]
    Modified,
    #[serde(rename = "D")]
    Deleted,
    #[serde(rename = "R")]
    Renamed,
}

impl FileStatus {
    pub fn code(&self) -> &'static str {
        match self {
            FileStatus::Added => "A",
            FileStatus::Modified => "M",
            FileStatus::Deleted => "D",
            FileStatus::Renamed => "R",
        }
    }
}

/// A changed source file with its two snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileChange {
    /// Path at the head revision (base revision for deletions).
    pub path: String,
    /// Path at the base revision, renames only.
    pub previous_path: Option<String>,
    pub status: FileStatus,
    pub old_text: Option<String>,
    pub new_text: Option<String>,
    /// Why a snapshot could not be retrieved.
    pub unreadable: Option<String>,
}

impl FileChange {
    pub fn added(path: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            previous_path: None,
            status: FileStatus::Added,
            old_text: None,
            new_text: Some(new_text.into()),
            unreadable: None,
        }
    }

    pub fn deleted(path: impl Into<String>, old_text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            previous_path: None,
            status: FileStatus::Deleted,
            old_text: Some(old_text.into()),
            new_text: None,
            unreadable: None,
        }
    }

    pub fn modified(
        path: impl Into<String>,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            previous_path: None,
            status: FileStatus::Modified,
            old_text: Some(old_text.into()),
            new_text: Some(new_text.into()),
            unreadable: None,
        }
    }

    pub fn renamed(
        previous_path: impl Into<String>,
        path: impl Into<String>,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            previous_path: Some(previous_path.into()),
            status: FileStatus::Renamed,
            old_text: Some(old_text.into()),
            new_text: Some(new_text.into()),
            unreadable: None,
        }
    }
}
