use std::path::Path;

use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::models::{RunStatus, StateOutcome};
use crate::reform::LedgerReport;

/// Render a colored terminal report of the run.
pub fn render(
    outcomes: &[StateOutcome],
    reforms: Option<&LedgerReport>,
    data_root: &Path,
    verbose: bool,
    quiet: bool,
) -> Result<()> {
    let total = outcomes.len();
    let ok_count = outcomes.iter().filter(|o| o.status == RunStatus::Ok).count();
    let empty_count = outcomes.iter().filter(|o| o.status == RunStatus::Empty).count();
    let failed_count = outcomes.iter().filter(|o| o.status == RunStatus::Failed).count();
    let recovered: u64 = outcomes.iter().map(|o| o.tally.total()).sum();

    if quiet {
        println!(
            "States: {}  Ok: {}  Empty: {}  Failed: {}  Recovered errors: {}",
            total,
            ok_count.to_string().green(),
            empty_count.to_string().yellow(),
            failed_count.to_string().red(),
            recovered,
        );
        return Ok(());
    }

    println!(
        "\n {} v{}",
        "suspension-trackr".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(" Data root: {}\n", data_root.display());

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("States processed   : {}", total));
    println!(
        " │  {:<48} │",
        format!("{}  Ok              : {:>4}", "✓".green(), ok_count)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Empty           : {:>4}", "⚠".yellow(), empty_count)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Failed          : {:>4}", "✗".red(), failed_count)
    );
    println!(
        " │  {:<48} │",
        format!("Recovered errors   : {}", recovered)
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    // Failures first; they are what a re-run needs to fix.
    if failed_count > 0 {
        println!(" {} States that failed:\n", "[FAILED]".red().bold());
        for outcome in outcomes.iter().filter(|o| o.status == RunStatus::Failed) {
            println!(
                "   {} — {}",
                outcome.state.bold(),
                outcome.failure.as_deref().unwrap_or("unknown failure")
            );
        }
        println!();
    }

    if verbose || recovered > 0 || empty_count > 0 {
        println!(" Per-state results:\n");
        render_state_table(outcomes);
        println!();
    }

    if let Some(report) = reforms {
        render_reform_tables(report, verbose);
    }

    Ok(())
}

fn render_state_table(outcomes: &[StateOutcome]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("State").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Files").add_attribute(Attribute::Bold),
            Cell::new("Records").add_attribute(Attribute::Bold),
            Cell::new("Months").add_attribute(Attribute::Bold),
            Cell::new("Errors").add_attribute(Attribute::Bold),
        ]);

    for outcome in outcomes {
        let (status_str, status_color) = match outcome.status {
            RunStatus::Ok => ("✓ ok", Color::Green),
            RunStatus::Empty => ("⚠ empty", Color::Yellow),
            RunStatus::Failed => ("✗ failed", Color::Red),
        };

        table.add_row(vec![
            Cell::new(&outcome.state),
            Cell::new(status_str)
                .fg(status_color)
                .set_alignment(CellAlignment::Center),
            Cell::new(outcome.source_files),
            Cell::new(outcome.records),
            Cell::new(outcome.months),
            Cell::new(summarize_tally(outcome)),
        ]);
    }

    println!("{table}");
}

/// Compact error-tally cell, e.g. `3 date, 1 row, pages [12, 14]`.
fn summarize_tally(outcome: &StateOutcome) -> String {
    let t = &outcome.tally;
    let mut parts = Vec::new();
    if t.date_errors > 0 {
        parts.push(format!("{} date", t.date_errors));
    }
    if t.date_format_errors > 0 {
        parts.push(format!("{} ledger date", t.date_format_errors));
    }
    if t.malformed_rows > 0 {
        parts.push(format!("{} row", t.malformed_rows));
    }
    if t.unmapped_labels > 0 {
        parts.push(format!("{} label", t.unmapped_labels));
    }
    if t.extraction_errors > 0 {
        parts.push(format!("{} extraction", t.extraction_errors));
    }
    if !t.failed_pages.is_empty() {
        parts.push(format!("pages {:?}", t.failed_pages));
    }
    if parts.is_empty() {
        "—".to_string()
    } else {
        parts.join(", ")
    }
}

fn render_reform_tables(report: &LedgerReport, verbose: bool) {
    if !report.events.is_empty() {
        println!(" Reform annotations ({} resolved):\n", report.events.len());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("State").add_attribute(Attribute::Bold),
                Cell::new("Series").add_attribute(Attribute::Bold),
                Cell::new("Bill").add_attribute(Attribute::Bold),
                Cell::new("Enacted").add_attribute(Attribute::Bold),
                Cell::new("Effective").add_attribute(Attribute::Bold),
                Cell::new("FTP").add_attribute(Attribute::Bold),
                Cell::new("FTA").add_attribute(Attribute::Bold),
            ]);
        for event in &report.events {
            table.add_row(vec![
                Cell::new(&event.state),
                Cell::new(&event.series),
                Cell::new(&event.bill),
                Cell::new(event.enacted.to_string()),
                Cell::new(event.effective.to_string()),
                Cell::new(event.ftp_reform.to_string()),
                Cell::new(event.fta_reform.to_string()),
            ]);
        }
        println!("{table}\n");
    }

    if !report.unresolved.is_empty() {
        println!(
            " {} Ledger rows with no matching series:\n",
            "[UNRESOLVED]".yellow().bold()
        );
        for entry in &report.unresolved {
            println!("   {} ({})", entry.state, entry.bill);
        }
        println!();
    }

    if verbose && !report.skipped.is_empty() {
        println!(" Ledger rows skipped:\n");
        for err in &report.skipped {
            println!("   {err}");
        }
        println!();
    }
}
