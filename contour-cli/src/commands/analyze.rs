//! Analyze command - Structural changes between two revisions
//!
//! Runs the change-detection pipeline and prints the report. JSON output is
//! the bare report array; the table view adds a summary for people.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use contour_core::report::FileReport;
use contour_core::scope::ScopeFilter;
use contour_core::types::FileStatus;
use contour_core::{analyze, AnalysisRequest, ChangeReport};

use crate::commands::submit::deliver;
use crate::config::ContourConfig;
use crate::output::{JsonOutput, Output, OutputConfig, OutputFormat, Outputter};

/// Command-line inputs for `contour analyze`.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub base: String,
    pub head: String,
    pub output_file: Option<PathBuf>,
    pub threads: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub submit: bool,
    pub dry_run: bool,
    pub endpoint: Option<String>,
}

/// Report plus run metadata for display.
#[derive(Debug, Serialize)]
pub struct AnalyzeResult {
    pub base_ref: String,
    pub head_ref: String,
    pub report: ChangeReport,
    pub duration_ms: u64,
}

impl Outputter for AnalyzeResult {
    /// The JSON view is the report array alone.
    fn to_json(&self, config: &OutputConfig) -> String {
        JsonOutput::format(&self.report, config)
    }

    fn to_table(&self, _config: &OutputConfig) -> String {
        let mut output = String::new();
        let summary = self.report.summary();

        output.push_str(&format!(
            "{} {} -> {}\n",
            "CHANGES:".cyan().bold(),
            self.base_ref.yellow(),
            self.head_ref.green()
        ));
        output.push_str(&format!("{} ({}ms)\n", summary.text(), self.duration_ms));

        if self.report.is_empty() {
            output.push_str(&format!("\n{}", "No structural changes detected.".dimmed()));
            return output;
        }

        for file in &self.report.files {
            output.push('\n');
            output.push_str(&file_header(file));
            output.push('\n');

            if let Some(error) = &file.error {
                output.push_str(&format!("    {} {}\n", "error:".red(), error));
                continue;
            }

            for contract in file.contracts.iter().flatten() {
                let methods = if contract.methods.is_empty() {
                    "(declaration only)".dimmed().to_string()
                } else {
                    contract.methods.join(", ")
                };
                output.push_str(&format!(
                    "    {} {}: {}\n",
                    contract.kind.as_str().dimmed(),
                    contract.name.bold(),
                    methods
                ));
            }
            if !file.functions.is_empty() {
                output.push_str(&format!(
                    "    {} {}\n",
                    "file-level:".dimmed(),
                    file.functions.join(", ")
                ));
            }
        }

        output.trim_end().to_string()
    }
}

fn file_header(file: &FileReport) -> String {
    let status = match file.status {
        FileStatus::Added => "A".green().bold(),
        FileStatus::Modified => "M".yellow().bold(),
        FileStatus::Deleted => "D".red().bold(),
        FileStatus::Renamed => "R".blue().bold(),
    };
    let marker = if file.is_unanalyzable() {
        "!".red().bold().to_string()
    } else {
        " ".to_string()
    };

    match &file.previous_file {
        Some(previous) => format!(
            "{}{} {} {}",
            marker,
            status,
            file.file,
            format!("(from {})", previous).dimmed()
        ),
        None => format!("{}{} {}", marker, status, file.file),
    }
}

/// Build the pipeline request from flags, config and defaults (in that order).
pub fn build_request(
    root: &Path,
    scope: ScopeFilter,
    options: &AnalyzeOptions,
    config: &ContourConfig,
) -> AnalysisRequest {
    let deadline = options
        .timeout_secs
        .map(Duration::from_secs)
        .or_else(|| config.deadline());

    AnalysisRequest::new(root, options.base.clone(), options.head.clone())
        .with_scope(scope)
        .with_deadline(deadline)
        .with_threads(options.threads.or_else(|| config.threads()))
}

/// Run the analyze command.
pub async fn run(
    root: &Path,
    scope: ScopeFilter,
    options: AnalyzeOptions,
    config: &ContourConfig,
    output: OutputConfig,
) -> Result<()> {
    let start = Instant::now();
    let request = build_request(root, scope, &options, config);

    let report = tokio::task::spawn_blocking(move || analyze(&request))
        .await
        .context("Analysis task panicked")??;

    let result = AnalyzeResult {
        base_ref: options.base.clone(),
        head_ref: options.head.clone(),
        report,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    let output_file = options
        .output_file
        .clone()
        .or_else(|| config.output_file().map(PathBuf::from));
    if let Some(path) = &output_file {
        let json = result.report.to_json(true)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    let payload = result.report.to_json(false)?;
    let files = result.report.len();
    Output::new(result, output.clone()).render()?;

    if options.submit || options.dry_run {
        let delivery = deliver(
            payload,
            files,
            options.endpoint.as_deref(),
            Some((options.base.as_str(), options.head.as_str())),
            config,
            options.dry_run,
        )
        .await?;

        // stdout already carries the report.
        let status_config = OutputConfig {
            format: OutputFormat::Table,
            ..output
        };
        eprintln!("{}", delivery.render_to_string(status_config));
    }

    Ok(())
}
