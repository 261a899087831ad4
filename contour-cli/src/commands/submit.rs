//! Submit command - Send a change report to the audit service
//!
//! Also hosts the delivery step shared with `contour analyze --submit`.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use contour_core::ChangeReport;

use crate::config::ContourConfig;
use crate::output::{Output, OutputConfig, Outputter};
use crate::submit::{AuditClient, SubmitOutcome, SubmitRequest};

/// A header as it would be sent, token masked.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

/// What a dry run would have sent.
#[derive(Debug, Clone, Serialize)]
pub struct DryRunPreview {
    pub endpoint: String,
    pub headers: Vec<HeaderEntry>,
    pub payload_bytes: usize,
    pub files: usize,
}

impl DryRunPreview {
    pub fn new(request: &SubmitRequest, files: usize) -> Self {
        Self {
            endpoint: request.endpoint.clone(),
            headers: request
                .redacted_headers()
                .into_iter()
                .map(|(name, value)| HeaderEntry { name, value })
                .collect(),
            payload_bytes: request.payload.len(),
            files,
        }
    }
}

impl Outputter for DryRunPreview {
    fn to_table(&self, _config: &OutputConfig) -> String {
        let mut output = format!(
            "{} POST {}\n",
            "DRY RUN:".yellow().bold(),
            self.endpoint.cyan()
        );
        for header in &self.headers {
            output.push_str(&format!("  {}: {}\n", header.name.dimmed(), header.value));
        }
        output.push_str(&format!(
            "  payload: {} bytes, {} file entr{}\n",
            self.payload_bytes,
            self.files,
            if self.files == 1 { "y" } else { "ies" }
        ));
        output.push_str(&format!("{}", "Nothing was sent.".dimmed()));
        output
    }
}

/// Result of a completed submission.
#[derive(Debug, Serialize)]
pub struct SubmitResult {
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
    pub files: usize,
    pub submitted_at: String,
}

impl Outputter for SubmitResult {
    fn to_table(&self, _config: &OutputConfig) -> String {
        let mut output = format!(
            "{} {} file entr{} to {} ({}, {} attempt{})\n",
            "SUBMITTED:".green().bold(),
            self.files,
            if self.files == 1 { "y" } else { "ies" },
            self.outcome.endpoint.cyan(),
            self.outcome.status,
            self.outcome.attempts,
            if self.outcome.attempts == 1 { "" } else { "s" }
        );
        if !self.outcome.response.trim().is_empty() {
            output.push_str(&format!("  {}", self.outcome.response.trim().dimmed()));
        }
        output
    }
}

/// Build the request for `payload`, then either describe it or send it.
///
/// Returns the rendered preview for dry runs and the submission result otherwise.
pub async fn deliver(
    payload: String,
    files: usize,
    endpoint: Option<&str>,
    revisions: Option<(&str, &str)>,
    config: &ContourConfig,
    dry_run: bool,
) -> Result<Delivery> {
    let mut request = SubmitRequest::new(endpoint.or(config.endpoint()), payload)?
        .with_token(config.token());
    if let Some((base, head)) = revisions {
        request = request.with_revisions(base, head);
    }

    if request.token.is_none() {
        tracing::warn!(
            "{} is not set, submitting without authorization",
            config.submit.token_env
        );
    }

    if dry_run {
        return Ok(Delivery::DryRun(DryRunPreview::new(&request, files)));
    }

    let client = AuditClient::new(config.submit_timeout(), config.retries())?;
    let outcome = client.submit(&request).await?;

    Ok(Delivery::Submitted(SubmitResult {
        outcome,
        files,
        submitted_at: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Outcome of [`deliver`].
pub enum Delivery {
    DryRun(DryRunPreview),
    Submitted(SubmitResult),
}

impl Delivery {
    pub fn render(self, config: OutputConfig) -> Result<()> {
        match self {
            Delivery::DryRun(preview) => Output::new(preview, config).render(),
            Delivery::Submitted(result) => Output::new(result, config).render(),
        }
    }

    pub fn render_to_string(self, config: OutputConfig) -> String {
        match self {
            Delivery::DryRun(preview) => Output::new(preview, config).render_to_string(),
            Delivery::Submitted(result) => Output::new(result, config).render_to_string(),
        }
    }
}

/// Run the submit command on an existing report file.
pub async fn run(
    report_file: &Path,
    endpoint: Option<&str>,
    dry_run: bool,
    config: &ContourConfig,
    output: OutputConfig,
) -> Result<()> {
    let payload = std::fs::read_to_string(report_file)
        .with_context(|| format!("Failed to read report {}", report_file.display()))?;
    let report: ChangeReport = serde_json::from_str(&payload)
        .with_context(|| format!("{} is not a change report", report_file.display()))?;

    tracing::info!(
        "Submitting {} ({} file entries)",
        report_file.display(),
        report.len()
    );

    deliver(payload, report.len(), endpoint, None, config, dry_run)
        .await?
        .render(output)
}
