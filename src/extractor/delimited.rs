use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord};

use crate::config::{ColumnRef, StateConfig};
use crate::error::SourceError;
use crate::extractor::Extraction;
use crate::models::RawRecord;

/// Adapter for delimited-text sources: per-person sanction dumps and other
/// row-per-record exports. Rows with the wrong field count are skipped and
/// tallied, never fatal to the file.
pub struct DelimitedExtractor {
    state: String,
    config: StateConfig,
}

impl DelimitedExtractor {
    pub fn new(state: String, config: StateConfig) -> Self {
        DelimitedExtractor { state, config }
    }
}

impl super::Extractor for DelimitedExtractor {
    fn extract(&self, path: &Path) -> Result<Extraction> {
        let file = File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let delimiter = self.config.delimiter.unwrap_or(',') as u8;
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_headers)
            .flexible(true)
            .from_reader(file);

        let headers = if self.config.has_headers {
            Some(reader.headers()?.clone())
        } else {
            None
        };

        let binding = Binding::resolve(&self.config, headers.as_ref())
            .map_err(|e| anyhow!("{}: {e}", path.display()))?;

        let mut out = Extraction::default();
        // Data rows start after the header line when there is one.
        let first_line = if self.config.has_headers { 2 } else { 1 };

        for (i, result) in reader.records().enumerate() {
            let line = first_line + i as u64;
            let record = match result {
                Ok(r) => r,
                Err(_) => {
                    out.skipped.push(SourceError::MalformedRow {
                        line,
                        expected: binding.expected_fields,
                        found: 0,
                    });
                    continue;
                }
            };

            if record.len() != binding.expected_fields {
                out.skipped.push(SourceError::MalformedRow {
                    line,
                    expected: binding.expected_fields,
                    found: record.len(),
                });
                continue;
            }

            match binding.row_to_record(&self.state, &record, line) {
                Ok(raw) => out.records.push(raw),
                Err(err) => out.skipped.push(err),
            }
        }

        Ok(out)
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["csv", "txt", "tsv"]
    }
}

/// Column positions resolved once per file, up front, so a bad binding is a
/// structural failure rather than a per-row one.
struct Binding {
    date: DateBinding,
    label: usize,
    count: Option<usize>,
    expected_fields: usize,
}

enum DateBinding {
    Single(usize),
    MonthYear { month: usize, year: usize },
}

impl Binding {
    fn resolve(config: &StateConfig, headers: Option<&StringRecord>) -> Result<Self, String> {
        let date = match (&config.columns.date, &config.columns.month, &config.columns.year) {
            (Some(d), _, _) => DateBinding::Single(resolve_column(d, headers)?),
            (None, Some(m), Some(y)) => DateBinding::MonthYear {
                month: resolve_column(m, headers)?,
                year: resolve_column(y, headers)?,
            },
            _ => return Err("no date column configured".to_string()),
        };

        let label = config
            .columns
            .label
            .as_ref()
            .ok_or_else(|| "no label column configured".to_string())
            .and_then(|l| resolve_column(l, headers))?;

        let count = match &config.columns.count {
            Some(c) => Some(resolve_column(c, headers)?),
            None => None,
        };

        let expected_fields = match headers {
            Some(h) => h.len(),
            None => {
                let mut max = label;
                if let Some(c) = count {
                    max = max.max(c);
                }
                match date {
                    DateBinding::Single(d) => max = max.max(d),
                    DateBinding::MonthYear { month, year } => max = max.max(month).max(year),
                }
                max + 1
            }
        };

        Ok(Binding { date, label, count, expected_fields })
    }

    fn row_to_record(
        &self,
        state: &str,
        record: &StringRecord,
        line: u64,
    ) -> Result<RawRecord, SourceError> {
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let raw_date = match &self.date {
            DateBinding::Single(d) => field(*d).to_string(),
            DateBinding::MonthYear { month, year } => {
                format!("{} {}", field(*month), field(*year))
            }
        };

        let count = match self.count {
            Some(c) => {
                let text = field(c);
                text.replace(',', "").parse::<u64>().map_err(|_| {
                    SourceError::MalformedRow {
                        line,
                        expected: self.expected_fields,
                        found: record.len(),
                    }
                })?
            }
            // Per-person files: each row is one suspension event.
            None => 1,
        };

        Ok(RawRecord {
            state: state.to_string(),
            raw_date,
            raw_label: field(self.label).to_string(),
            count,
        })
    }
}

fn resolve_column(r: &ColumnRef, headers: Option<&StringRecord>) -> Result<usize, String> {
    match r {
        ColumnRef::Index(i) => Ok(*i),
        ColumnRef::Name(name) => {
            let headers =
                headers.ok_or_else(|| format!("column '{name}' referenced but file has no headers"))?;
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
                .ok_or_else(|| format!("column '{name}' not found in header row"))
        }
    }
}
