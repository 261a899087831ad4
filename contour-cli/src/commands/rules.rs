//! Rules command - Show the effective scope rule set
//!
//! Lists the built-in defaults followed by the user rules, in evaluation order.
//! The last matching rule decides whether a file is analyzed.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use contour_core::scope::{Polarity, RuleOrigin, ScopeFilter, SkippedRule};

use crate::output::{Output, OutputConfig, Outputter};

#[derive(Debug, Serialize)]
pub struct RuleRow {
    pub index: usize,
    pub origin: RuleOrigin,
    pub polarity: Polarity,
    pub pattern: String,
}

/// Effective rule set for display.
#[derive(Debug, Serialize)]
pub struct RuleList {
    pub ignore_file: String,
    pub ignore_file_found: bool,
    pub extension: String,
    pub rules: Vec<RuleRow>,
    pub skipped: Vec<SkippedRule>,
}

impl RuleList {
    pub fn new(filter: &ScopeFilter, ignore_file: &Path) -> Self {
        Self {
            ignore_file: ignore_file.display().to_string(),
            ignore_file_found: ignore_file.is_file(),
            extension: filter.extension().to_string(),
            rules: filter
                .rules()
                .iter()
                .enumerate()
                .map(|(i, rule)| RuleRow {
                    index: i + 1,
                    origin: rule.origin,
                    polarity: rule.polarity,
                    pattern: rule.pattern.clone(),
                })
                .collect(),
            skipped: filter.skipped().to_vec(),
        }
    }
}

impl Outputter for RuleList {
    fn to_table(&self, _config: &OutputConfig) -> String {
        let mut output = String::new();

        let source = if self.ignore_file_found {
            self.ignore_file.green()
        } else {
            format!("{} (not found, defaults only)", self.ignore_file).dimmed()
        };
        output.push_str(&format!("{} {}\n", "SCOPE RULES:".cyan().bold(), source));
        output.push_str(&format!(
            "Only *.{} files are considered; the last matching rule wins.\n\n",
            self.extension
        ));

        output.push_str(&format!(
            "  {:>3}  {:<8} {:<8} {}\n",
            "#", "ORIGIN", "EFFECT", "PATTERN"
        ));
        output.push_str(&format!("  {}\n", "-".repeat(50)));
        for row in &self.rules {
            let effect = match row.polarity {
                Polarity::Include => "include".green(),
                Polarity::Exclude => "exclude".red(),
            };
            output.push_str(&format!(
                "  {:>3}  {:<8} {:<8} {}\n",
                row.index,
                row.origin.to_string(),
                effect,
                row.pattern
            ));
        }

        if !self.skipped.is_empty() {
            output.push_str(&format!("\n{}\n", "SKIPPED (invalid):".yellow().bold()));
            for skipped in &self.skipped {
                output.push_str(&format!(
                    "  line {}: {} {}\n",
                    skipped.line_number,
                    skipped.pattern,
                    format!("({})", skipped.reason).dimmed()
                ));
            }
        }

        output.trim_end().to_string()
    }
}

/// Run the rules command.
pub fn run(filter: &ScopeFilter, ignore_file: &Path, output: OutputConfig) -> Result<()> {
    Output::new(RuleList::new(filter, ignore_file), output).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use contour_core::scope::DEFAULT_RULES;

    #[test]
    fn test_rule_list_keeps_evaluation_order() {
        let filter = ScopeFilter::default().with_user_rules("!mocks/Keep.sol\n[bad\n");
        let list = RuleList::new(&filter, Path::new("/nonexistent/.scopeignore"));

        assert!(!list.ignore_file_found);
        assert_eq!(list.rules.len(), DEFAULT_RULES.len() + 1);
        assert_eq!(list.rules[0].index, 1);
        assert_eq!(list.rules[0].origin, RuleOrigin::Default);
        let last = list.rules.last().unwrap();
        assert_eq!(last.pattern, "!mocks/Keep.sol");
        assert_eq!(last.polarity, Polarity::Include);
        assert_eq!(list.skipped.len(), 1);
    }

    #[test]
    fn test_rule_list_json() {
        let list = RuleList::new(&ScopeFilter::default(), Path::new(".scopeignore"));
        let json = Output::new(list, OutputConfig::new(OutputFormat::Json)).render_to_string();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["rules"][0]["pattern"], "node_modules/");
        assert_eq!(value["rules"][0]["origin"], "default");
        assert_eq!(value["rules"][0]["polarity"], "exclude");
    }
}
