//! Structural diff engine for declaration trees.
//!
//! Compares the declarations of two snapshots by identity rather than by line,
//! so reformatting, comment edits and reordering never register as changes.
//!
//! # Example
//!
//! ```
//! use contour_core::differ::{diff_trees, DiffKind};
//! use contour_core::parser::extract;
//!
//! let old = extract("contract Token { function a() external {} }", "Token.sol").unwrap();
//! let new = extract("contract Token { function a() external {} function b() external {} }", "Token.sol").unwrap();
//!
//! let diffs = diff_trees(&old, &new);
//! assert_eq!(diffs[0].nested[0].name, "b");
//! assert_eq!(diffs[0].nested[0].change, DiffKind::Added);
//! ```

pub mod changes;
pub mod comparator;

pub use changes::{DeclarationDiff, DiffKind, DiffSummary};
pub use comparator::diff_trees;
