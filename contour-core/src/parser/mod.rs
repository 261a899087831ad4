//! Declaration extraction.
//!
//! Turns one source snapshot into a [`DeclarationTree`] using tree-sitter. The
//! extractor is grammar-aware, so layout and comments never leak into the
//! signatures or body hashes it produces.

use crate::error::{CoreError, ParseFailure};
use crate::types::DeclarationTree;

pub mod solidity;

mod helpers;

/// Verify that the grammar loads before any file is parsed.
///
/// A grammar the runtime rejects would fail every snapshot the same way, so it
/// is a configuration error rather than a per-file parse failure.
pub fn check_grammar() -> crate::error::Result<()> {
    solidity::new_parser()
        .map(|_| ())
        .map_err(|e| CoreError::Grammar {
            message: e.to_string(),
        })
}

/// Extract the declarations of one snapshot.
///
/// Source without any declarations yields an empty tree, not an error.
pub fn extract(source: &str, path: &str) -> Result<DeclarationTree, ParseFailure> {
    solidity::parse(source, path)
}

/// Extract an optional snapshot; a missing side is an empty tree.
pub fn extract_optional(
    source: Option<&str>,
    path: &str,
) -> Result<DeclarationTree, ParseFailure> {
    match source {
        Some(text) => extract(text, path),
        None => Ok(DeclarationTree::new()),
    }
}
