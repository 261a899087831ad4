//! Contour CLI - Structural change detection for Solidity sources
//!
//! Compares two git revisions declaration by declaration and reports which
//! contracts, functions, modifiers and events changed, ignoring formatting and
//! comment noise.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;
mod redact;
mod submit;

use commands::analyze::AnalyzeOptions;
use config::ContourConfig;
use output::{OutputConfig, OutputFormat};

/// Structural change detection for Solidity sources.
#[derive(Parser)]
#[command(name = "contour")]
#[command(author, version)]
#[command(about = "Structural change detection for Solidity sources")]
#[command(
    long_about = "Contour compares two git revisions declaration by declaration and reports\nwhich contracts and members changed. Formatting and comment edits are ignored."
)]
#[command(propagate_version = true)]
#[command(after_help = "Examples:
  contour analyze main HEAD                 Changes on the current branch
  contour analyze v1.2.0 v1.3.0 -o out.json Write the report to a file
  contour analyze main HEAD --submit        Send the report to the audit service
  contour rules                             Show which files are in scope")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report structural changes between two revisions
    #[command(visible_alias = "a")]
    Analyze {
        /// Base revision (branch, tag or commit)
        base: String,

        /// Head revision (branch, tag or commit)
        head: String,

        /// Working tree root (defaults to current directory)
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Scope ignore file, relative to the tree root
        #[arg(long, value_name = "FILE")]
        scopeignore: Option<String>,

        /// Also write the report to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Worker threads (default: number of cores)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Abort the run after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Submit the report to the audit service
        #[arg(long)]
        submit: bool,

        /// Show the submission request without sending it
        #[arg(long)]
        dry_run: bool,

        /// Audit service endpoint (overrides config)
        #[arg(long, env = "CONTOUR_AUDIT_ENDPOINT", value_name = "URL")]
        endpoint: Option<String>,
    },

    /// Submit an existing report file to the audit service
    Submit {
        /// Report file produced by `contour analyze`
        report: PathBuf,

        /// Directory holding `.contour.toml` (defaults to current directory)
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Audit service endpoint (overrides config)
        #[arg(long, env = "CONTOUR_AUDIT_ENDPOINT", value_name = "URL")]
        endpoint: Option<String>,

        /// Show the request without sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the effective scope rules in evaluation order
    Rules {
        /// Working tree root (defaults to current directory)
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Scope ignore file, relative to the tree root
        #[arg(long, value_name = "FILE")]
        scopeignore: Option<String>,
    },
}

/// Setup logging based on verbosity. Logs go to stderr; stdout carries reports.
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

/// Apply the config's color setting globally, if it has one.
fn apply_color_override(config: &ContourConfig) {
    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }
}

/// Output settings: CLI flag > config default > JSON.
fn output_config(cli_format: Option<OutputFormat>, config: &ContourConfig) -> OutputConfig {
    let format = cli_format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default()
    });
    OutputConfig::auto_detect(format, config.use_color())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    match command {
        Commands::Analyze {
            base,
            head,
            path,
            scopeignore,
            output,
            threads,
            timeout,
            submit,
            dry_run,
            endpoint,
        } => {
            let config = ContourConfig::load(&path)?;
            apply_color_override(&config);
            let (scope, _) = commands::load_scope(&path, scopeignore.as_deref(), &config)?;
            let options = AnalyzeOptions {
                base,
                head,
                output_file: output,
                threads,
                timeout_secs: timeout,
                submit,
                dry_run,
                endpoint,
            };
            let output_config = output_config(cli.format, &config);
            commands::analyze::run(&path, scope, options, &config, output_config).await
        }
        Commands::Submit {
            report,
            path,
            endpoint,
            dry_run,
        } => {
            let config = ContourConfig::load(&path)?;
            apply_color_override(&config);
            let output_config = output_config(cli.format, &config);
            commands::submit::run(&report, endpoint.as_deref(), dry_run, &config, output_config)
                .await
        }
        Commands::Rules { path, scopeignore } => {
            let config = ContourConfig::load(&path)?;
            apply_color_override(&config);
            let (scope, ignore_file) =
                commands::load_scope(&path, scopeignore.as_deref(), &config)?;
            commands::rules::run(&scope, &ignore_file, output_config(cli.format, &config))
        }
    }
}
