//! Gitignore-style scope filter deciding which changed files enter analysis.
//!
//! The rule set is the built-in defaults followed by the user's `.scopeignore`
//! lines. Every rule is compiled into its own single-line matcher from the
//! `ignore` crate so that the verdict can be taken from the *last* rule that
//! matches a path, including rules that only match one of its parent directories.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::Result;

/// Default name of the user ignore file, relative to the tree root.
pub const DEFAULT_SCOPEIGNORE: &str = ".scopeignore";

/// Default source extension (without the dot).
pub const DEFAULT_EXTENSION: &str = "sol";

/// Rules applied before any user rule.
pub const DEFAULT_RULES: &[&str] = &[
    "node_modules/",
    "[Tt]ests/",
    "[Tt]est/",
    "[Mm]ocks/",
    "[Mm]ock/",
    "[Ii]nterfaces/",
    "[Ii]nterface/",
    "*[Ii]nterface.sol",
    "*[Tt]est.sol",
    "*[Mm]ock.sol",
];

/// Whether a matching rule keeps or drops a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Include,
    Exclude,
}

/// Where a rule came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOrigin {
    Default,
    User,
}

impl fmt::Display for RuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOrigin::Default => write!(f, "default"),
            RuleOrigin::User => write!(f, "user"),
        }
    }
}

/// A single compiled scope rule.
#[derive(Clone, Debug)]
pub struct ScopeRule {
    pub pattern: String,
    pub polarity: Polarity,
    pub origin: RuleOrigin,
    matcher: Gitignore,
}

impl ScopeRule {
    /// Compile one ignore-file line. Blank lines and comments yield `Ok(None)`.
    pub fn parse(line: &str, origin: RuleOrigin) -> std::result::Result<Option<Self>, ignore::Error> {
        let pattern = line.trim();
        if pattern.is_empty() || pattern.starts_with('#') {
            return Ok(None);
        }

        let mut builder = GitignoreBuilder::new(".");
        builder.add_line(None, pattern)?;
        let matcher = builder.build()?;

        let polarity = if pattern.starts_with('!') {
            Polarity::Include
        } else {
            Polarity::Exclude
        };

        Ok(Some(Self {
            pattern: pattern.to_string(),
            polarity,
            origin,
            matcher,
        }))
    }

    /// True when the pattern matches the path itself or, for directory patterns,
    /// any directory above it.
    pub fn matches(&self, path: &str) -> bool {
        !matches!(
            self.matcher.matched_path_or_any_parents(path, false),
            Match::None
        )
    }
}

/// An ignore-file line that failed to compile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedRule {
    pub line_number: usize,
    pub pattern: String,
    pub reason: String,
}

/// Immutable rule set evaluated against repository-relative paths.
#[derive(Clone, Debug)]
pub struct ScopeFilter {
    rules: Vec<ScopeRule>,
    extension: String,
    skipped: Vec<SkippedRule>,
}

impl Default for ScopeFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION)
    }
}

impl ScopeFilter {
    /// Filter holding only the built-in defaults.
    pub fn new(extension: &str) -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .filter_map(|line| ScopeRule::parse(line, RuleOrigin::Default).ok().flatten())
            .collect();

        Self {
            rules,
            extension: extension.trim_start_matches('.').to_string(),
            skipped: Vec::new(),
        }
    }

    /// Load the defaults plus the rules of `ignore_file`. A missing file is not an error.
    pub fn load(ignore_file: &Path, extension: &str) -> Result<Self> {
        let filter = Self::new(extension);
        match fs::read_to_string(ignore_file) {
            Ok(content) => {
                tracing::info!("Using scope rules from {}", ignore_file.display());
                Ok(filter.with_user_rules(&content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    "No {} found, using default scope rules",
                    ignore_file.display()
                );
                Ok(filter)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Append user rules, one per line, after the current rules.
    pub fn with_user_rules(mut self, content: &str) -> Self {
        for (index, line) in content.lines().enumerate() {
            match ScopeRule::parse(line, RuleOrigin::User) {
                Ok(Some(rule)) => self.rules.push(rule),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        "Skipping invalid scope rule on line {}: '{}': {}",
                        index + 1,
                        line.trim(),
                        e
                    );
                    self.skipped.push(SkippedRule {
                        line_number: index + 1,
                        pattern: line.trim().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        self
    }

    /// Whether a repository-relative path should be analyzed.
    pub fn is_included(&self, path: &str) -> bool {
        let path = normalize(path);
        if !self.has_source_extension(path) {
            return false;
        }

        match self.verdict(path) {
            Some(rule) => rule.polarity == Polarity::Include,
            None => true,
        }
    }

    /// The last rule matching `path`, if any.
    pub fn verdict(&self, path: &str) -> Option<&ScopeRule> {
        let path = normalize(path);
        self.rules.iter().rev().find(|rule| rule.matches(path))
    }

    pub fn has_source_extension(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == self.extension)
            .unwrap_or(false)
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn rules(&self) -> &[ScopeRule] {
        &self.rules
    }

    /// Lines that were dropped because they did not compile.
    pub fn skipped(&self) -> &[SkippedRule] {
        &self.skipped
    }
}

/// Strip `./` and leading separators; the matchers expect relative paths.
fn normalize(path: &str) -> &str {
    path.trim_start_matches("./").trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_exclude_test_mock_interface_paths() {
        let filter = ScopeFilter::default();

        assert!(!filter.is_included("mocks/Foo.sol"));
        assert!(!filter.is_included("contracts/mocks/Foo.sol"));
        assert!(!filter.is_included("test/Token.t.sol"));
        assert!(!filter.is_included("src/Tests/deep/Helper.sol"));
        assert!(!filter.is_included("node_modules/@oz/ERC20.sol"));
        assert!(!filter.is_included("src/interfaces/IVault.sol"));
        assert!(!filter.is_included("src/TokenInterface.sol"));
        assert!(!filter.is_included("src/TokenTest.sol"));
        assert!(!filter.is_included("src/TokenMock.sol"));

        assert!(filter.is_included("contracts/Token.sol"));
        assert!(filter.is_included("./contracts/Vault.sol"));
    }

    #[test]
    fn test_extension_gate() {
        let filter = ScopeFilter::default();
        assert!(!filter.is_included("contracts/Token.js"));
        assert!(!filter.is_included("README.md"));
        assert!(!filter.is_included("contracts/sol"));

        let vyper = ScopeFilter::new(".vy");
        assert!(vyper.is_included("contracts/Pool.vy"));
        assert!(!vyper.is_included("contracts/Pool.sol"));
    }

    #[test]
    fn test_user_rule_reincludes_default_exclude() {
        let filter = ScopeFilter::default().with_user_rules("!mocks/Keep.sol\n");

        assert!(filter.is_included("mocks/Keep.sol"));
        assert!(!filter.is_included("mocks/Other.sol"));
    }

    #[test]
    fn test_last_matching_rule_wins() {
        let filter = ScopeFilter::default().with_user_rules("!mocks/Keep.sol\nmocks/\n");
        assert!(!filter.is_included("mocks/Keep.sol"));

        let filter = ScopeFilter::default().with_user_rules("scripts/\n!scripts/Deploy.sol\n");
        assert!(filter.is_included("scripts/Deploy.sol"));
        assert!(!filter.is_included("scripts/Upgrade.sol"));
    }

    #[test]
    fn test_directory_pattern_matches_at_any_depth() {
        let filter = ScopeFilter::default().with_user_rules("generated/\n");

        assert!(!filter.is_included("generated/A.sol"));
        assert!(!filter.is_included("src/generated/nested/B.sol"));
        assert!(filter.is_included("src/generator/C.sol"));
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let filter = ScopeFilter::default().with_user_rules("# comment\n\n   \nlegacy/\n");
        assert_eq!(filter.rules().len(), DEFAULT_RULES.len() + 1);
        assert!(filter.skipped().is_empty());
    }

    #[test]
    fn test_malformed_rule_is_skipped() {
        let filter = ScopeFilter::default().with_user_rules("[abc\nlegacy/\n");

        assert_eq!(filter.skipped().len(), 1);
        assert_eq!(filter.skipped()[0].line_number, 1);
        assert_eq!(filter.rules().len(), DEFAULT_RULES.len() + 1);
        assert!(!filter.is_included("legacy/Old.sol"));
    }

    #[test]
    fn test_verdict_reports_rule_origin() {
        let filter = ScopeFilter::default().with_user_rules("!mocks/Keep.sol\n");

        let rule = filter.verdict("mocks/Keep.sol").unwrap();
        assert_eq!(rule.origin, RuleOrigin::User);
        assert_eq!(rule.polarity, Polarity::Include);

        let rule = filter.verdict("mocks/Other.sol").unwrap();
        assert_eq!(rule.origin, RuleOrigin::Default);
        assert_eq!(rule.pattern, "[Mm]ocks/");

        assert!(filter.verdict("contracts/Token.sol").is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let filter = ScopeFilter::load(Path::new("/nonexistent/.scopeignore"), "sol").unwrap();
        assert_eq!(filter.rules().len(), DEFAULT_RULES.len());
    }

    #[test]
    fn test_load_appends_user_rules_after_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"script/\n!test/Fixture.sol\n").unwrap();

        let filter = ScopeFilter::load(file.path(), "sol").unwrap();

        let origins: Vec<RuleOrigin> = filter.rules().iter().map(|r| r.origin).collect();
        assert_eq!(origins.last(), Some(&RuleOrigin::User));
        assert_eq!(origins[0], RuleOrigin::Default);
        assert!(!filter.is_included("script/Deploy.sol"));
        assert!(filter.is_included("test/Fixture.sol"));
    }

    #[test]
    fn test_filter_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScopeFilter>();
    }
}
