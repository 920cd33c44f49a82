use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, Data, DataType, Reader};

use crate::config::{ColumnRef, Layout, StateConfig};
use crate::dates::{month_from_sheet_name, year_from_filename};
use crate::error::SourceError;
use crate::extractor::Extraction;
use crate::models::{Month, RawRecord};

/// Adapter for workbook sources. The layout is fixed per state by
/// configuration: long rows, a wide month-by-label matrix, or one sheet per
/// month with the month in the tab name.
pub struct SpreadsheetExtractor {
    state: String,
    config: StateConfig,
}

impl SpreadsheetExtractor {
    pub fn new(state: String, config: StateConfig) -> Self {
        SpreadsheetExtractor { state, config }
    }

    fn selected_sheets(&self, names: &[String]) -> Vec<String> {
        if let Some(sheet) = &self.config.sheet {
            return names
                .iter()
                .filter(|n| n.trim().eq_ignore_ascii_case(sheet.trim()))
                .cloned()
                .collect();
        }
        if let Some(prefix) = &self.config.sheet_prefix {
            return names
                .iter()
                .filter(|n| n.starts_with(prefix.as_str()))
                .cloned()
                .collect();
        }
        names.to_vec()
    }
}

impl super::Extractor for SpreadsheetExtractor {
    fn extract(&self, path: &Path) -> Result<Extraction> {
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("failed to open workbook {}", path.display()))?;

        let sheet_names = workbook.sheet_names().to_owned();
        let selected = self.selected_sheets(&sheet_names);
        if selected.is_empty() {
            bail!(
                "{}: no sheet matches the configured selection",
                path.display()
            );
        }

        let mut out = Extraction::default();
        for name in &selected {
            let range = workbook
                .worksheet_range(name)
                .with_context(|| format!("failed to read sheet '{name}' of {}", path.display()))?;
            let rows: Vec<&[Data]> = range.rows().collect();

            match self.config.layout {
                Layout::Long => {
                    out.absorb(interpret_long(&self.state, &self.config, &rows)?);
                }
                Layout::Wide => {
                    out.absorb(interpret_wide(&self.state, &self.config, &rows)?);
                }
                Layout::SheetMonth => {
                    // Non-month tabs (notes, summaries) are skipped, not errors.
                    let Some(month_num) = month_from_sheet_name(name) else {
                        continue;
                    };
                    let stem = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or_default();
                    let year = year_from_filename(stem).ok_or_else(|| {
                        anyhow!("{}: no 4-digit year token in file name", path.display())
                    })?;
                    let month = Month::new(year, month_num)
                        .ok_or_else(|| anyhow!("sheet '{name}': month out of range"))?;
                    out.absorb(interpret_sheet_month(&self.state, month, &rows));
                }
            }
        }

        Ok(out)
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["xlsx", "xls", "xlsb", "ods"]
    }
}

/// Long layout: one record per row, columns bound by the state config.
fn interpret_long(state: &str, config: &StateConfig, rows: &[&[Data]]) -> Result<Extraction> {
    let mut out = Extraction::default();
    let Some((header, body)) = rows.split_first() else {
        return Ok(out);
    };

    let label_col = require_column(config.columns.label.as_ref(), header, "label")?;
    let count_col = optional_column(config.columns.count.as_ref(), header)?;
    let date = match (&config.columns.date, &config.columns.month, &config.columns.year) {
        (Some(d), _, _) => DateCols::Single(require_column(Some(d), header, "date")?),
        (None, Some(m), Some(y)) => DateCols::MonthYear {
            month: require_column(Some(m), header, "month")?,
            year: require_column(Some(y), header, "year")?,
        },
        _ => bail!("no date column configured for long layout"),
    };

    for (i, row) in body.iter().enumerate() {
        let line = i as u64 + 2;
        let Some(raw_label) = cell_text(row.get(label_col)) else {
            // Blank label cells terminate many agency exports; skip quietly.
            continue;
        };

        let raw_date = match &date {
            DateCols::Single(d) => cell_text(row.get(*d)).unwrap_or_default(),
            DateCols::MonthYear { month, year } => {
                let m = cell_text(row.get(*month)).unwrap_or_default();
                let y = cell_text(row.get(*year)).unwrap_or_default();
                format!("{m} {y}")
            }
        };

        let count = match count_col {
            Some(c) => match cell_count(row.get(c)) {
                Some(n) => n,
                None => {
                    out.skipped.push(SourceError::MalformedRow {
                        line,
                        expected: header.len(),
                        found: row.len(),
                    });
                    continue;
                }
            },
            None => 1,
        };

        out.records.push(RawRecord {
            state: state.to_string(),
            raw_date,
            raw_label,
            count,
        });
    }

    Ok(out)
}

/// Wide layout: rows keyed by a month column, one column per raw label,
/// cells are counts. Every non-empty cell yields one record labelled with
/// its column header.
fn interpret_wide(state: &str, config: &StateConfig, rows: &[&[Data]]) -> Result<Extraction> {
    let mut out = Extraction::default();
    let Some((header, body)) = rows.split_first() else {
        return Ok(out);
    };

    let month_col = match (&config.columns.date, &config.columns.month) {
        (Some(d), _) => require_column(Some(d), header, "date")?,
        (None, Some(m)) => require_column(Some(m), header, "month")?,
        // The month key is conventionally the leftmost column.
        _ => 0,
    };

    let label_cols: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != month_col)
        .filter_map(|(i, cell)| cell_text(Some(cell)).map(|label| (i, label)))
        .filter(|(_, label)| !label.eq_ignore_ascii_case("total"))
        .collect();

    for (i, row) in body.iter().enumerate() {
        let line = i as u64 + 2;
        let Some(raw_date) = cell_text(row.get(month_col)) else {
            continue;
        };

        for (col, label) in &label_cols {
            let cell = row.get(*col);
            if cell.map(|c| c.is_empty()).unwrap_or(true) {
                continue;
            }
            match cell_count(cell) {
                Some(count) => out.records.push(RawRecord {
                    state: state.to_string(),
                    raw_date: raw_date.clone(),
                    raw_label: label.clone(),
                    count,
                }),
                None => out.skipped.push(SourceError::MalformedRow {
                    line,
                    expected: header.len(),
                    found: row.len(),
                }),
            }
        }
    }

    Ok(out)
}

/// Sheet-per-month layout: the whole sheet belongs to one month; a reason
/// column and an optional count column are located by header keywords, the
/// way the source agency formats its monthly action tabs.
fn interpret_sheet_month(state: &str, month: Month, rows: &[&[Data]]) -> Extraction {
    let mut out = Extraction::default();
    let Some((header, body)) = rows.split_first() else {
        return out;
    };

    let headers: Vec<String> = header
        .iter()
        .map(|c| cell_text(Some(c)).unwrap_or_default().to_lowercase())
        .collect();

    let reason_col = headers
        .iter()
        .position(|h| {
            ["action", "reason", "category", "type", "disposition"]
                .iter()
                .any(|k| h.contains(k))
        })
        .unwrap_or(0);

    let count_col = headers.iter().position(|h| {
        ["count", "counts", "n", "num", "number", "total", "qty", "quantity"]
            .contains(&h.as_str())
    });

    for (i, row) in body.iter().enumerate() {
        let line = i as u64 + 2;
        let Some(raw_label) = cell_text(row.get(reason_col)) else {
            continue;
        };
        let count = match count_col {
            Some(c) => match cell_count(row.get(c)) {
                Some(n) => n,
                None => {
                    out.skipped.push(SourceError::MalformedRow {
                        line,
                        expected: header.len(),
                        found: row.len(),
                    });
                    continue;
                }
            },
            None => 1,
        };
        out.records.push(RawRecord {
            state: state.to_string(),
            raw_date: month.to_string(),
            raw_label,
            count,
        });
    }

    out
}

enum DateCols {
    Single(usize),
    MonthYear { month: usize, year: usize },
}

fn require_column(r: Option<&ColumnRef>, header: &[Data], what: &str) -> Result<usize> {
    let r = r.ok_or_else(|| anyhow!("no {what} column configured"))?;
    optional_column(Some(r), header)?
        .ok_or_else(|| anyhow!("{what} column not found in header row"))
}

fn optional_column(r: Option<&ColumnRef>, header: &[Data]) -> Result<Option<usize>> {
    match r {
        None => Ok(None),
        Some(ColumnRef::Index(i)) => Ok(Some(*i)),
        Some(ColumnRef::Name(name)) => Ok(header.iter().position(|cell| {
            cell_text(Some(cell))
                .map(|h| h.trim().eq_ignore_ascii_case(name.trim()))
                .unwrap_or(false)
        })),
    }
}

/// Cell as trimmed text, `None` when empty. Dates render as `YYYY-MM-DD`,
/// whole floats without the trailing `.0`.
fn cell_text(cell: Option<&Data>) -> Option<String> {
    let cell = cell?;
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => ndt.format("%Y-%m-%d").to_string(),
            None => return None,
        },
        Data::DateTimeIso(s) => s.trim().to_string(),
        Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Cell as a non-negative whole count.
fn cell_count(cell: Option<&Data>) -> Option<u64> {
    match cell? {
        Data::Int(i) if *i >= 0 => Some(*i as u64),
        Data::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Some(*f as u64),
        Data::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}
