//! # CLI Module
//!
//! Command-line interface for the signer pipeline.
//!
//! ## Usage
//! ```bash
//! # Sign values given on the command line
//! signer run 0 1 1 2 3 5 8
//!
//! # Read values from a file, one per line ("-" reads stdin)
//! signer run --input values.txt
//!
//! # Simulate a slow signing backend
//! signer run 0 1 --fast-latency-ms 100 --slow-latency-ms 10
//!
//! # JSON output
//! signer run 0 1 --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use signer_pipeline::core::digest::DigestConfig;
use signer_pipeline::core::item::Item;
use signer_pipeline::core::pipeline::{PipelineBuilder, PipelineResult};
use signer_pipeline::error::{PipelineError, Result};
use signer_pipeline::core::stage::DEFAULT_MAX_IN_FLIGHT;
use signer_pipeline::events::{event_channel, Event, ItemEvent, PipelineEvent, StageEvent};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

/// Exit status when the run finished but some items failed
const PARTIAL_FAILURE: u8 = 2;

/// Signer - sign values through a concurrent hashing pipeline
#[derive(Parser, Debug)]
#[command(name = "signer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run SingleHash -> MultiHash -> CombineResults over the given values
    Run {
        /// Values to sign
        items: Vec<String>,

        /// Read additional values from a file, one per line ("-" for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Simulated latency of each fast digest call
        #[arg(long, default_value = "0")]
        fast_latency_ms: u64,

        /// Simulated latency of each slow digest call (spent holding the lock)
        #[arg(long, default_value = "0")]
        slow_latency_ms: u64,

        /// Items each queue buffers before backpressure
        #[arg(long, default_value = "100")]
        capacity: usize,

        /// Items each stage works on at once
        #[arg(long, default_value_t = DEFAULT_MAX_IN_FLIGHT)]
        max_in_flight: usize,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// The final value only
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            items,
            input,
            fast_latency_ms,
            slow_latency_ms,
            capacity,
            max_in_flight,
            output,
            verbose,
        } => {
            let mut values: Vec<Item> = items.iter().map(|raw| Item::parse(raw)).collect();
            if let Some(path) = input {
                values.extend(read_items(&path)?);
            }

            let digests = DigestConfig::new()
                .fast_latency(Duration::from_millis(fast_latency_ms))
                .slow_latency(Duration::from_millis(slow_latency_ms));

            run_signer(values, digests, capacity, max_in_flight, output, verbose)
        }
    }
}

fn read_items(path: &Path) -> Result<Vec<Item>> {
    let io_error = |source: io::Error| PipelineError::Io {
        path: path.display().to_string(),
        source,
    };

    let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(std::fs::File::open(path).map_err(io_error)?))
    };

    let mut items = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(io_error)?;
        let value = line.trim();
        if !value.is_empty() {
            items.push(Item::parse(value));
        }
    }
    Ok(items)
}

fn run_signer(
    items: Vec<Item>,
    digests: DigestConfig,
    capacity: usize,
    max_in_flight: usize,
    output: OutputFormat,
    verbose: bool,
) -> Result<ExitCode> {
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Signer").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let pipeline = PipelineBuilder::signer()
        .digests(digests)
        .queue_capacity(capacity)
        .max_in_flight(max_in_flight)
        .build()?;

    let (sender, receiver) = event_channel();

    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let mut emitted = 0usize;
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Stage(StageEvent::Finished { stage, .. }) => {
                    pb.println(format!("  {} {}", style("✓").green(), stage));
                }
                Event::Item(ItemEvent::Emitted { stage, value }) => {
                    emitted += 1;
                    if verbose {
                        pb.println(format!("    {} {}", style(stage).dim(), value));
                    }
                    pb.set_message(format!("{emitted} values emitted"));
                }
                Event::Item(ItemEvent::Failed { stage, item, message }) => {
                    pb.println(format!(
                        "  {} {} {}: {}",
                        style("✗").red(),
                        stage,
                        item,
                        message
                    ));
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Pipeline(PipelineEvent::Cancelled)
                | Event::Pipeline(PipelineEvent::Error { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(items, &sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let result = result?;

    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &result),
        OutputFormat::Json => print_json_results(&result)?,
        OutputFormat::Minimal => print_minimal_results(&result),
    }

    if result.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(PARTIAL_FAILURE))
    }
}

fn print_pretty_results(term: &Term, result: &PipelineResult) {
    term.write_line("").ok();
    term.write_line(&format!("{} Run Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    for line in summary_lines(result) {
        term.write_line(&line).ok();
    }

    term.write_line("").ok();
    term.write_line(&format!("{}", style("Result:").bold().underlined()))
        .ok();

    // The result itself goes to stdout so it can be piped.
    println!("{}", result.output().unwrap_or_default());
}

/// Counts and failures of a finished run.
///
/// Failures are counted as recorded, not as items: the collector can fail
/// after every item was signed.
fn summary_lines(result: &PipelineResult) -> Vec<String> {
    let mut lines = vec![format!(
        "  {} items submitted in {:.1}s",
        style(result.total_items).cyan(),
        result.duration_ms as f64 / 1000.0
    )];

    if !result.failures.is_empty() {
        lines.push(format!("  {} failures", style(result.failures.len()).red()));
        for failure in &result.failures {
            lines.push(format!("    {} {}", style("✗").red(), failure));
        }
    }
    lines
}

fn print_json_results(result: &PipelineResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

fn print_minimal_results(result: &PipelineResult) {
    println!("{}", result.output().unwrap_or_default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use signer_pipeline::error::{ItemError, ItemFailure, QueueError};
    use uuid::Uuid;

    fn result_with(failures: Vec<ItemFailure>) -> PipelineResult {
        PipelineResult {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            outputs: Vec::new(),
            failures,
            total_items: 3,
            duration_ms: 1200,
        }
    }

    fn plain(lines: Vec<String>) -> Vec<String> {
        lines
            .iter()
            .map(|line| console::strip_ansi_codes(line).into_owned())
            .collect()
    }

    #[test]
    fn clean_run_reports_submitted_items() {
        let lines = plain(summary_lines(&result_with(Vec::new())));
        assert_eq!(lines, vec!["  3 items submitted in 1.2s"]);
    }

    #[test]
    fn collector_failure_is_not_subtracted_from_items() {
        let failure = ItemFailure::new(
            "CombineResults",
            "<3 combined values>",
            ItemError::Queue(QueueError::Disconnected),
        );
        let lines = plain(summary_lines(&result_with(vec![failure])));

        assert_eq!(lines[0], "  3 items submitted in 1.2s");
        assert_eq!(lines[1], "  1 failures");
        assert!(lines[2].contains("CombineResults"));
        assert!(!lines.iter().any(|line| line.contains("signed")));
    }
}
