//! Error types for contour-core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for contour-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Configuration-class errors. Any of these aborts the run without a partial report.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The git executable could not be started.
    #[error("failed to execute git: {message} (is git installed?)")]
    GitUnavailable {
        /// Underlying spawn error.
        message: String,
    },

    /// The working tree root is not inside a git repository.
    #[error("not a git repository: {path}")]
    NotARepository {
        /// Path that was probed.
        path: String,
    },

    /// A revision identifier does not resolve to a commit.
    #[error("unknown revision: {revision}")]
    UnknownRevision {
        /// The identifier as given by the caller.
        revision: String,
    },

    /// A git command exited unsuccessfully.
    #[error("git {command} failed (exit code {code}): {stderr}")]
    Git {
        /// Git subcommand that failed.
        command: String,
        /// Process exit code, -1 when killed by a signal.
        code: i32,
        /// Trimmed standard error.
        stderr: String,
    },

    /// The run deadline elapsed before the report was assembled.
    #[error("analysis exceeded the run deadline of {seconds}s")]
    DeadlineExceeded {
        /// Configured deadline in seconds.
        seconds: u64,
    },

    /// The Solidity grammar cannot be loaded by the linked tree-sitter runtime.
    #[error("cannot load the Solidity grammar: {message}")]
    Grammar {
        /// Loader error, usually an ABI version mismatch.
        message: String,
    },

    /// IO error reading an ignore file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A snapshot that could not be parsed. Recovered at file granularity.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{path}:{line}:{column}: {message}")]
pub struct ParseFailure {
    pub path: String,
    /// 1-based
    pub line: u32,
    /// 1-based
    pub column: u32,
    pub message: String,
}

impl ParseFailure {
    pub fn new(path: impl Into<String>, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            column,
            message: message.into(),
        }
    }
}
