use std::path::Path;

use anyhow::{Context, Result};
use lopdf::Document;
use regex::Regex;

use crate::config::StateConfig;
use crate::error::SourceError;
use crate::extractor::Extraction;
use crate::models::RawRecord;

/// Adapter for PDF sources: statewide activity reports whose tabular region
/// is embedded in running page text.
///
/// A table line carries a leading month token, a reason in the middle, and a
/// trailing count. Pages on which no such line appears fail individually;
/// their numbers are reported, and extraction continues with the rest.
pub struct PdfExtractor {
    state: String,
    config: StateConfig,
}

impl PdfExtractor {
    pub fn new(state: String, config: StateConfig) -> Self {
        PdfExtractor { state, config }
    }
}

impl super::Extractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<Extraction> {
        let doc = Document::load(path)
            .with_context(|| format!("failed to open PDF {}", path.display()))?;

        let start = self.config.start_page.unwrap_or(1);
        let scanner = LineScanner::new();
        let mut out = Extraction::default();
        let mut scanned = 0u32;

        let pages = doc.get_pages();
        for (&page_no, _) in pages.iter() {
            if page_no < start {
                continue;
            }
            scanned += 1;
            let text = match doc.extract_text(&[page_no]) {
                Ok(t) => t,
                Err(_) => {
                    out.skipped.push(SourceError::Extraction { page: page_no });
                    out.failed_pages.push(page_no);
                    continue;
                }
            };

            let records = scanner.scan_page(&self.state, &text);
            if records.is_empty() {
                out.skipped.push(SourceError::Extraction { page: page_no });
                out.failed_pages.push(page_no);
            } else {
                out.records.extend(records);
            }
        }

        if scanned == 0 {
            anyhow::bail!(
                "{}: no pages at or after configured start page {start}",
                path.display()
            );
        }

        Ok(out)
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pdf"]
    }
}

/// Recognises table lines in extracted page text.
pub struct LineScanner {
    /// Leading month token: `YYYY-MM`, `M/YYYY`, or `<month name> YYYY`.
    date: Regex,
    /// Trailing integer count.
    count: Regex,
}

impl LineScanner {
    pub fn new() -> Self {
        LineScanner {
            date: Regex::new(
                r"(?i)^\s*(\d{4}-\d{1,2}|\d{1,2}/\d{4}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{4})\b",
            )
            .unwrap(),
            count: Regex::new(r"([0-9][0-9,]*)\s*$").unwrap(),
        }
    }

    /// Records from one page of text; empty when the page holds no table.
    pub fn scan_page(&self, state: &str, text: &str) -> Vec<RawRecord> {
        let mut records = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.len() < 5 || is_header_line(line) {
                continue;
            }
            let Some(date_match) = self.date.find(line) else {
                continue;
            };
            let rest = &line[date_match.end()..];
            let Some(count_match) = self.count.captures(rest) else {
                continue;
            };
            let count: u64 = match count_match[1].replace(',', "").parse() {
                Ok(n) => n,
                Err(_) => continue,
            };
            let label_end = count_match.get(1).unwrap().start();
            let raw_label = rest[..label_end].trim().to_string();
            if raw_label.is_empty() {
                continue;
            }
            records.push(RawRecord {
                state: state.to_string(),
                raw_date: date_match.as_str().trim().to_string(),
                raw_label,
                count,
            });
        }
        records
    }
}

impl Default for LineScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Column-header and dimension lines that repeat on every report page.
fn is_header_line(line: &str) -> bool {
    ["Dimensions:", "AccountType", "Credential", "Activity Type", "Page "]
        .iter()
        .any(|h| line.contains(h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_page_extracts_triples() {
        let text = "\
Activity Type Action Description Count
Dimensions: AccountType Credential
2021-06 D45 - Failed to appear in court 1,204
2021-06 A21 - DUI revocation 87
Open none footer text
";
        let scanner = LineScanner::new();
        let records = scanner.scan_page("NewMexico", text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].raw_date, "2021-06");
        assert_eq!(records[0].raw_label, "D45 - Failed to appear in court");
        assert_eq!(records[0].count, 1204);
        assert_eq!(records[1].count, 87);
    }

    #[test]
    fn test_scan_page_month_year_and_name_tokens() {
        let scanner = LineScanner::new();
        let records = scanner.scan_page("NewMexico", "6/2021 D53 - Failed to pay fine 15\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_date, "6/2021");

        let records = scanner.scan_page("NewMexico", "June 2021 D53 - Failed to pay fine 15\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_date, "June 2021");
    }

    #[test]
    fn test_page_without_table_yields_nothing() {
        let scanner = LineScanner::new();
        let text = "Narrative summary of the reporting period.\nNothing tabular here.\n";
        assert!(scanner.scan_page("NewMexico", text).is_empty());
    }

    #[test]
    fn test_count_required_at_line_end() {
        let scanner = LineScanner::new();
        // A date line with no trailing count is not a table line.
        assert!(scanner
            .scan_page("NewMexico", "2021-06 continued on next page\n")
            .is_empty());
    }
}
