use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error::SourceError;
use crate::models::{Month, ReformEvent, ReformStrength};

/// One parsed ledger row, not yet resolved to a series.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub state: String,
    pub enacted: Month,
    pub bill: String,
    pub effective: Month,
    pub ftp_reform: ReformStrength,
    pub fta_reform: ReformStrength,
}

/// Everything the ledger produced: resolved events, rows whose state name
/// matched no generated series, and rows skipped for parse failures.
#[derive(Debug, Default)]
pub struct LedgerReport {
    pub events: Vec<ReformEvent>,
    pub unresolved: Vec<LedgerEntry>,
    pub skipped: Vec<SourceError>,
}

/// Load the reform ledger and resolve each row against the generated series
/// names. Duplicate rows for the same state and month are all retained;
/// reconciling them is a data-curation concern upstream of this tool.
pub fn match_reforms(path: &Path, series_names: &[String]) -> Result<LedgerReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read reform ledger {}", path.display()))?;

    let (entries, skipped) = parse_ledger(&content);
    let mut report = LedgerReport { skipped, ..Default::default() };

    for entry in entries {
        match resolve_name(&entry.state, series_names) {
            Some(series) => report.events.push(ReformEvent {
                state: entry.state.clone(),
                enacted: entry.enacted,
                bill: entry.bill.clone(),
                effective: entry.effective,
                ftp_reform: entry.ftp_reform,
                fta_reform: entry.fta_reform,
                series: series.to_string(),
            }),
            None => report.unresolved.push(entry),
        }
    }

    Ok(report)
}

/// Parse ledger text. The delimiter (tab or comma) is detected once per
/// file from the header line; the header itself is skipped. Rows that do
/// not parse are returned as errors, never fatal.
///
/// Columns: `State, Enacted Date (M/YYYY), Bill Number, Effective Date
/// (M/YYYY), Failure to Pay {Full|Partial|—}, Failure to Appear
/// {Full|Partial|Procedural|—}`.
pub fn parse_ledger(content: &str) -> (Vec<LedgerEntry>, Vec<SourceError>) {
    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    let mut lines = content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let Some((_, header)) = lines.next() else {
        return (entries, skipped);
    };
    let delimiter = detect_delimiter(header);

    for (i, line) in lines {
        let line_no = i as u64 + 1;
        let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();
        if fields.len() < 6 {
            skipped.push(SourceError::MalformedRow {
                line: line_no,
                expected: 6,
                found: fields.len(),
            });
            continue;
        }

        let Some(enacted) = Month::parse_month_year(fields[1]) else {
            skipped.push(SourceError::DateFormat { value: fields[1].to_string() });
            continue;
        };
        let Some(effective) = Month::parse_month_year(fields[3]) else {
            skipped.push(SourceError::DateFormat { value: fields[3].to_string() });
            continue;
        };
        let (Some(ftp_reform), Some(fta_reform)) =
            (ReformStrength::parse(fields[4]), ReformStrength::parse(fields[5]))
        else {
            skipped.push(SourceError::MalformedRow {
                line: line_no,
                expected: 6,
                found: fields.len(),
            });
            continue;
        };

        entries.push(LedgerEntry {
            state: fields[0].to_string(),
            enacted,
            bill: fields[2].to_string(),
            effective,
            ftp_reform,
            fta_reform,
        });
    }

    (entries, skipped)
}

/// Tab wins when the header holds at least one; these ledgers are
/// tab-separated exports or comma-edited text, never mixed within a file.
fn detect_delimiter(header: &str) -> char {
    if header.contains('\t') {
        '\t'
    } else {
        ','
    }
}

/// The ordered list of name variants tried when resolving a ledger state
/// against the generated series names. First variant under which the two
/// compare equal wins.
const NAME_VARIANTS: [fn(&str) -> String; 4] = [
    |s| s.to_string(),
    |s| s.trim().to_string(),
    |s| s.trim().to_lowercase(),
    // No-space variant: "New Mexico" resolves against "NewMexico".
    |s| {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    },
];

/// Resolve a ledger state name to one of the generated series names.
pub fn resolve_name<'a>(raw: &str, names: &'a [String]) -> Option<&'a str> {
    for variant in NAME_VARIANTS {
        let key = variant(raw);
        if let Some(hit) = names.iter().find(|n| variant(n) == key) {
            return Some(hit.as_str());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_colorado_row_resolves() {
        let ledger = "State, Enacted Date, Bill Number, Effective Date, Failure to Pay, Failure to Appear\n\
                      Colorado, 6/2021, HB21-1314, 1/2022, Full, Full\n";
        let (entries, skipped) = parse_ledger(ledger);
        assert!(skipped.is_empty());
        assert_eq!(entries.len(), 1);

        let names = vec!["Colorado".to_string(), "Texas".to_string()];
        let entry = &entries[0];
        assert_eq!(resolve_name(&entry.state, &names), Some("Colorado"));
        assert_eq!(entry.effective.to_string(), "2022-01");
        assert_eq!(entry.enacted.format_month_year(), "6/2021");
        assert_eq!(entry.bill, "HB21-1314");
        assert_eq!(entry.ftp_reform, ReformStrength::Full);
        assert_eq!(entry.fta_reform, ReformStrength::Full);
    }

    #[test]
    fn test_em_dash_means_none() {
        let ledger = "State\tEnacted\tBill\tEffective\tFTP\tFTA\n\
                      Oregon\t5/2020\tHB 4210\t10/2020\t—\tProcedural\n";
        let (entries, skipped) = parse_ledger(ledger);
        assert!(skipped.is_empty());
        assert_eq!(entries[0].ftp_reform, ReformStrength::None);
        assert_eq!(entries[0].fta_reform, ReformStrength::Procedural);
    }

    #[test]
    fn test_tab_delimiter_detected_from_header() {
        // Commas inside fields must not split tab-separated rows.
        let ledger = "State\tEnacted\tBill\tEffective\tFTP\tFTA\n\
                      Virginia\t3/2020\tHB 1196, as amended\t7/2021\tFull\t—\n";
        let (entries, skipped) = parse_ledger(ledger);
        assert!(skipped.is_empty());
        assert_eq!(entries[0].bill, "HB 1196, as amended");
    }

    #[test]
    fn test_bad_date_skips_row_not_file() {
        let ledger = "State, Enacted, Bill, Effective, FTP, FTA\n\
                      Utah, 2021-06, SB 1, 1/2022, Full, —\n\
                      Nevada, 6/2021, AB 116, 10/2021, Full, Full\n";
        let (entries, skipped) = parse_ledger(ledger);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].state, "Nevada");
        assert_eq!(skipped.len(), 1);
        assert!(matches!(skipped[0], SourceError::DateFormat { .. }));
    }

    #[test]
    fn test_short_row_is_malformed() {
        let ledger = "State, Enacted, Bill, Effective, FTP, FTA\n\
                      Idaho, 6/2021, HB 99\n";
        let (entries, skipped) = parse_ledger(ledger);
        assert!(entries.is_empty());
        assert!(matches!(
            skipped[0],
            SourceError::MalformedRow { expected: 6, found: 3, .. }
        ));
    }

    #[test]
    fn test_resolution_variant_order() {
        let names = vec![
            "NewMexico".to_string(),
            "newmexico ".to_string(),
            "Texas".to_string(),
        ];
        // Exact match wins before any normalization is applied.
        assert_eq!(resolve_name("Texas", &names), Some("Texas"));
        // Whitespace-stripped comparison beats the later variants.
        assert_eq!(resolve_name("newmexico", &names), Some("newmexico "));
        // Case-insensitive comparison.
        assert_eq!(resolve_name("TEXAS", &names), Some("Texas"));
        // No-space variant: ledger "New Mexico" hits series "NewMexico".
        assert_eq!(resolve_name("New Mexico", &names), Some("NewMexico"));
    }

    #[test]
    fn test_unresolved_rows_are_reported_not_dropped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Reforms.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "State, Enacted, Bill, Effective, FTP, FTA").unwrap();
        writeln!(f, "Colorado, 6/2021, HB21-1314, 1/2022, Full, Full").unwrap();
        writeln!(f, "Atlantis, 1/2021, AB 1, 2/2021, Partial, —").unwrap();

        let names = vec!["Colorado".to_string()];
        let report = match_reforms(&path, &names).unwrap();
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].series, "Colorado");
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].state, "Atlantis");
    }

    #[test]
    fn test_duplicate_rows_retained() {
        let ledger = "State, Enacted, Bill, Effective, FTP, FTA\n\
                      Colorado, 6/2021, HB21-1314, 1/2022, Full, —\n\
                      Colorado, 6/2021, SB21-055, 1/2022, —, Full\n";
        let (entries, _) = parse_ledger(ledger);
        assert_eq!(entries.len(), 2);
    }
}
