//! `suspension-trackr` — normalize per-state suspension records into canonical
//! monthly series and resolve reform annotations against them.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load pipeline config ([`config::load_config`]).
//! 3. Select states (everything configured, or the `--state` filters).
//! 4. Run each state's pipeline in its own task ([`pipeline`]):
//!    extract → normalize → aggregate → write. States never abort each other.
//! 5. Write the cross-state summary ([`writer::write_summary`]).
//! 6. Match the reform ledger against the generated series ([`reform`]).
//! 7. Render the requested report ([`report`]).
//! 8. Exit `0` (no failed state) or `1` (at least one failed run).

mod aggregate;
mod category;
mod cli;
mod config;
mod dates;
mod error;
mod extractor;
mod models;
mod pipeline;
mod reform;
mod report;
mod writer;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};

use cli::{Cli, ReportFormat};
use config::load_config;
use models::{RunStatus, StateOutcome, StateSeries};
use pipeline::{run_state, StateRun};
use reform::LedgerReport;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Resolve data root
    let data_root = cli
        .path
        .canonicalize()
        .unwrap_or_else(|_| cli.path.clone());

    // Load pipeline config
    let config = load_config(&data_root, cli.config.as_deref())?;

    // Select states (all configured; --state opts in)
    let selected: Vec<(String, config::StateConfig)> = config
        .states
        .iter()
        .filter(|(name, _)| {
            cli.states.is_empty()
                || cli.states.iter().any(|s| s.eq_ignore_ascii_case(name))
        })
        .map(|(name, cfg)| (name.clone(), cfg.clone()))
        .collect();

    if selected.is_empty() {
        eprintln!("No configured states match the selection");
        std::process::exit(1);
    }

    let out_dir = cli
        .out_dir
        .clone()
        .unwrap_or_else(|| data_root.join("Outputs"));

    // One isolated task per state; a failure in one never aborts the rest.
    let (outcomes, series) =
        run_states(selected, &data_root, &out_dir, cli.strict, cli.quiet).await;

    // Cross-state summary over the states that produced data
    if !series.is_empty() {
        writer::write_summary(&series, &out_dir.join("All.csv"))?;
    }

    // Reform matching needs the full set of generated series names, so it
    // runs strictly after every state task has settled.
    let reforms_path = cli
        .reforms
        .clone()
        .unwrap_or_else(|| data_root.join("Reforms.txt"));
    let ledger = if reforms_path.exists() {
        let names: Vec<String> = series.iter().map(|s| s.state.clone()).collect();
        Some(reform::match_reforms(&reforms_path, &names)?)
    } else {
        if !cli.quiet {
            eprintln!(
                "  {} reform ledger {} not found; annotations skipped",
                "→".cyan(),
                reforms_path.display()
            );
        }
        None
    };

    match cli.report {
        ReportFormat::Terminal => {
            report::terminal::render(
                &outcomes,
                ledger.as_ref(),
                &data_root,
                cli.verbose,
                cli.quiet,
            )?;
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_report(&outcomes, ledger.as_ref()))?);
        }
    }

    // Exit code: 1 if any state's pipeline failed structurally
    let has_failures = outcomes.iter().any(|o| o.status == RunStatus::Failed);
    if has_failures {
        std::process::exit(1);
    }

    Ok(())
}

/// Fan the selected states out over blocking tasks and gather their
/// outcomes in selection order.
async fn run_states(
    selected: Vec<(String, config::StateConfig)>,
    data_root: &Path,
    out_dir: &Path,
    strict: bool,
    quiet: bool,
) -> (Vec<StateOutcome>, Vec<StateSeries>) {
    let pb = if !quiet {
        let pb = ProgressBar::new(selected.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let tasks: Vec<_> = selected
        .into_iter()
        .map(|(state, state_config)| {
            let data_root = data_root.to_path_buf();
            let out_dir = out_dir.to_path_buf();
            let pb = pb.clone();
            async move {
                let task_state = state.clone();
                let result = tokio::task::spawn_blocking(move || {
                    run_state(&task_state, &state_config, &data_root, &out_dir, strict)
                })
                .await;
                if let Some(pb) = &pb {
                    pb.inc(1);
                    pb.set_message(state.clone());
                }
                (state, result)
            }
        })
        .collect();

    let mut outcomes = Vec::new();
    let mut series = Vec::new();
    for (state, result) in join_all(tasks).await {
        match result {
            Ok(StateRun { outcome, series: s }) => {
                if let Some(s) = s {
                    if !s.buckets.is_empty() {
                        series.push(s);
                    }
                }
                outcomes.push(outcome);
            }
            // A panicked task is contained the same way a failed run is.
            Err(join_err) => outcomes.push(StateOutcome {
                state,
                status: RunStatus::Failed,
                failure: Some(format!("pipeline task aborted: {join_err}")),
                source_files: 0,
                records: 0,
                months: 0,
                tally: Default::default(),
                output: None,
            }),
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    (outcomes, series)
}

fn json_report(
    outcomes: &[StateOutcome],
    ledger: Option<&LedgerReport>,
) -> serde_json::Value {
    let (reforms, unresolved) = match ledger {
        Some(report) => (
            serde_json::json!(report.events),
            serde_json::json!(report.unresolved),
        ),
        None => (serde_json::json!([]), serde_json::json!([])),
    };
    serde_json::json!({
        "states": outcomes,
        "reforms": reforms,
        "unresolved_reforms": unresolved,
    })
}
