//! Command implementations for Contour CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod analyze;
pub mod rules;
pub mod submit;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use contour_core::ScopeFilter;

use crate::config::ContourConfig;

/// Build the scope filter for a tree: defaults, then the ignore file, then the
/// `[scope].ignore` rules from config.
///
/// Relative ignore-file paths are taken from the tree root. Returns the filter
/// and the ignore file path that was consulted.
pub fn load_scope(
    root: &Path,
    scopeignore: Option<&str>,
    config: &ContourConfig,
) -> Result<(ScopeFilter, PathBuf)> {
    let ignore_file = root.join(scopeignore.unwrap_or(config.ignore_file()));
    let filter = ScopeFilter::load(&ignore_file, config.extension())
        .with_context(|| format!("Failed to read {}", ignore_file.display()))?
        .with_user_rules(&config.extra_rules());
    Ok((filter, ignore_file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contour_core::scope::{RuleOrigin, DEFAULT_RULES};
    use tempfile::TempDir;

    #[test]
    fn test_load_scope_layers_config_rules_last() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".scopeignore"), "script/\n").unwrap();
        let config: ContourConfig =
            toml::from_str("[scope]\nignore = [\"!script/Deploy.sol\"]\n").unwrap();

        let (filter, path) = load_scope(dir.path(), None, &config).unwrap();

        assert_eq!(path, dir.path().join(".scopeignore"));
        assert_eq!(filter.rules().len(), DEFAULT_RULES.len() + 2);
        assert_eq!(filter.rules().last().unwrap().origin, RuleOrigin::User);
        assert!(filter.is_included("script/Deploy.sol"));
        assert!(!filter.is_included("script/Upgrade.sol"));
    }

    #[test]
    fn test_load_scope_explicit_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("audit.ignore"), "vendor/\n").unwrap();

        let (filter, _) =
            load_scope(dir.path(), Some("audit.ignore"), &ContourConfig::default()).unwrap();
        assert!(!filter.is_included("vendor/Lib.sol"));
    }

    #[test]
    fn test_load_scope_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let (filter, _) = load_scope(dir.path(), None, &ContourConfig::default()).unwrap();
        assert_eq!(filter.rules().len(), DEFAULT_RULES.len());
    }
}
