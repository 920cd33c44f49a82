use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::aggregate::{aggregate, AggregateOptions};
use crate::category::normalizer::{normalize, LabelPolicy};
use crate::config::StateConfig;
use crate::extractor::{extractor_for, Extraction};
use crate::models::{RunStatus, RunTally, StateOutcome, StateSeries};
use crate::writer::write_series;

/// One state's pipeline result: the outcome to report, and the series (when
/// one was produced) for reform matching and the cross-state summary.
pub struct StateRun {
    pub outcome: StateOutcome,
    pub series: Option<StateSeries>,
}

/// Run one state end-to-end: discover source files, extract, normalize,
/// aggregate, write. Any structural failure becomes a `Failed` outcome so
/// sibling states keep running.
pub fn run_state(
    state: &str,
    config: &StateConfig,
    data_root: &Path,
    out_dir: &Path,
    strict: bool,
) -> StateRun {
    match run_state_inner(state, config, data_root, out_dir, strict) {
        Ok(run) => run,
        Err(err) => StateRun {
            outcome: StateOutcome {
                state: state.to_string(),
                status: RunStatus::Failed,
                failure: Some(format!("{err:#}")),
                source_files: 0,
                records: 0,
                months: 0,
                tally: RunTally::default(),
                output: None,
            },
            series: None,
        },
    }
}

fn run_state_inner(
    state: &str,
    config: &StateConfig,
    data_root: &Path,
    out_dir: &Path,
    strict: bool,
) -> Result<StateRun> {
    let folder = data_root.join(config.folder_for(state));
    if !folder.is_dir() {
        return Err(anyhow!("data folder not found: {}", folder.display()));
    }

    let extractor = extractor_for(state, config);
    let files = source_files(&folder, extractor.extensions())?;
    if files.is_empty() {
        return Err(anyhow!(
            "no source files with extensions {:?} in {}",
            extractor.extensions(),
            folder.display()
        ));
    }

    // An unreadable file is structural and fails the whole state; row- and
    // page-level problems come back inside the Extraction instead.
    let mut extraction = Extraction::default();
    for file in &files {
        extraction.absorb(extractor.extract(file)?);
    }

    let mut tally = RunTally::default();
    for err in &extraction.skipped {
        tally.record(err.kind());
    }
    tally.failed_pages.extend(extraction.failed_pages.iter().copied());

    let policy = if strict || config.strict_labels {
        LabelPolicy::Strict
    } else {
        LabelPolicy::Lenient
    };

    let mut normalized = Vec::with_capacity(extraction.records.len());
    for record in &extraction.records {
        match normalize(&config.vocabulary, policy, &record.raw_label) {
            Ok(category) => normalized.push((record.clone(), category)),
            Err(err) => tally.record(err.kind()),
        }
    }

    let series = aggregate(
        state,
        &normalized,
        AggregateOptions {
            date_format: config.date_format,
            min_year: config.min_year,
            max_year: config.max_year,
            zero_fill: config.zero_fill,
        },
        &mut tally,
    );

    // A state with zero surviving records still gets its (header-only)
    // artifact plus the full tally, rather than vanishing from the outputs.
    let output = out_dir.join(format!("{state}.csv"));
    write_series(&series, &output)?;

    let status = if series.buckets.is_empty() {
        RunStatus::Empty
    } else {
        RunStatus::Ok
    };

    Ok(StateRun {
        outcome: StateOutcome {
            state: state.to_string(),
            status,
            failure: None,
            source_files: files.len(),
            records: extraction.records.len() as u64,
            months: series.buckets.len(),
            tally,
            output: Some(output),
        },
        series: Some(series),
    })
}

/// Source files in the state folder, filtered by the adapter's extensions
/// and sorted by name so re-runs visit them in the same order.
fn source_files(folder: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        if let Some(ext) = ext {
            if extensions.contains(&ext.as_str()) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
