//! Contour core - structural change detection for Solidity sources.
//!
//! Given two revisions of a git repository, this crate finds which contracts,
//! interfaces, libraries, structs, enums, functions, modifiers and events were
//! added, removed or modified, ignoring edits that only touch layout or comments.
//!
//! # Features
//!
//! - **Scope filtering**: gitignore-style rules drop tests, mocks and interfaces before parsing
//! - **Snapshot retrieval**: file contents come from commit trees, never the working directory
//! - **Grammar-aware extraction**: tree-sitter based declaration trees with normalized signatures
//! - **Identity-keyed diffing**: declarations are matched by kind and name, not by line
//! - **Parallel processing**: per-file work runs on a Rayon pool
//!
//! # Usage
//!
//! ```no_run
//! use contour_core::pipeline::{analyze, AnalysisRequest};
//! use contour_core::scope::ScopeFilter;
//! use std::path::Path;
//!
//! let scope = ScopeFilter::load(Path::new(".scopeignore"), "sol")?;
//! let request = AnalysisRequest::new(".", "main", "HEAD").with_scope(scope);
//! let report = analyze(&request)?;
//! println!("{}", report.to_json(true).unwrap_or_default());
//! # Ok::<(), contour_core::error::CoreError>(())
//! ```

pub mod differ;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod revision;
pub mod scope;
pub mod types;

pub use error::{CoreError, ParseFailure};
pub use pipeline::{analyze, AnalysisRequest};
pub use report::{ChangeReport, FileReport, ReportSummary};
pub use scope::ScopeFilter;
