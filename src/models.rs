use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of suspension-reason buckets shared by every state's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CanonicalCategory {
    #[serde(rename = "FTP")]
    Ftp,
    #[serde(rename = "FTA")]
    Fta,
    #[serde(rename = "road_safety")]
    RoadSafety,
    Other,
}

impl CanonicalCategory {
    pub const ALL: [CanonicalCategory; 4] = [
        CanonicalCategory::Ftp,
        CanonicalCategory::Fta,
        CanonicalCategory::RoadSafety,
        CanonicalCategory::Other,
    ];

    /// Column name used in the canonical CSV schema.
    pub fn column_name(&self) -> &'static str {
        match self {
            CanonicalCategory::Ftp => "FTP",
            CanonicalCategory::Fta => "FTA",
            CanonicalCategory::RoadSafety => "road_safety",
            CanonicalCategory::Other => "Other",
        }
    }
}

impl fmt::Display for CanonicalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

/// A calendar month, the unit of the canonical time axis.
///
/// Displays as `YYYY-MM`; also parses and re-formats the reform ledger's
/// `M/YYYY` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    /// Build a month, rejecting month numbers outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Month { year, month })
        } else {
            None
        }
    }

    /// Parse the ledger's `M/YYYY` shape (e.g. `6/2021`).
    pub fn parse_month_year(s: &str) -> Option<Self> {
        let (m, y) = s.trim().split_once('/')?;
        let month: u32 = m.trim().parse().ok()?;
        let year: i32 = y.trim().parse().ok()?;
        if y.trim().len() != 4 {
            return None;
        }
        Month::new(year, month)
    }

    /// Re-format as the ledger's `M/YYYY` shape (no zero padding on the month).
    pub fn format_month_year(&self) -> String {
        format!("{}/{:04}", self.month, self.year)
    }

    /// The following calendar month.
    pub fn succ(&self) -> Month {
        if self.month == 12 {
            Month { year: self.year + 1, month: 1 }
        } else {
            Month { year: self.year, month: self.month + 1 }
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = String;

    /// Parse the canonical `YYYY-MM` shape.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("not a YYYY-MM month: {s}"))?;
        let year: i32 = y.parse().map_err(|_| format!("bad year in {s}"))?;
        let month: u32 = m.parse().map_err(|_| format!("bad month in {s}"))?;
        Month::new(year, month).ok_or_else(|| format!("month out of range in {s}"))
    }
}

impl Serialize for Month {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One extracted observation, before normalization. Never persisted.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub state: String,
    /// Date text in whatever shape the source uses; parsed per state config.
    pub raw_date: String,
    pub raw_label: String,
    pub count: u64,
}

/// Per-category counts for one month; all four categories always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub ftp: u64,
    pub fta: u64,
    pub road_safety: u64,
    pub other: u64,
}

impl CategoryCounts {
    pub fn get(&self, category: CanonicalCategory) -> u64 {
        match category {
            CanonicalCategory::Ftp => self.ftp,
            CanonicalCategory::Fta => self.fta,
            CanonicalCategory::RoadSafety => self.road_safety,
            CanonicalCategory::Other => self.other,
        }
    }

    pub fn add(&mut self, category: CanonicalCategory, count: u64) {
        match category {
            CanonicalCategory::Ftp => self.ftp += count,
            CanonicalCategory::Fta => self.fta += count,
            CanonicalCategory::RoadSafety => self.road_safety += count,
            CanonicalCategory::Other => self.other += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.ftp + self.fta + self.road_safety + self.other
    }

    pub fn merge(&mut self, other: &CategoryCounts) {
        self.ftp += other.ftp;
        self.fta += other.fta;
        self.road_safety += other.road_safety;
        self.other += other.other;
    }
}

/// One month of one state's series. `total` always equals the category sum.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyBucket {
    pub month: Month,
    pub counts: CategoryCounts,
    pub total: u64,
}

impl MonthlyBucket {
    pub fn new(month: Month, counts: CategoryCounts) -> Self {
        let total = counts.total();
        MonthlyBucket { month, counts, total }
    }
}

/// The canonical per-state artifact: buckets strictly ascending by month.
#[derive(Debug, Clone, Serialize)]
pub struct StateSeries {
    pub state: String,
    pub buckets: Vec<MonthlyBucket>,
}

impl StateSeries {
    /// Inclusive year span as `min-max`, if the series is non-empty.
    pub fn year_range(&self) -> Option<String> {
        let first = self.buckets.first()?.month.year;
        let last = self.buckets.last()?.month.year;
        Some(format!("{first}-{last}"))
    }
}

/// Strength of one reform, per ledger column. `—` in the ledger maps to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReformStrength {
    None,
    Partial,
    Full,
    /// FTA column only: a procedural change rather than an elimination.
    Procedural,
}

impl ReformStrength {
    /// Parse a ledger cell. The em dash (and a bare hyphen) mean "not applicable".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "—" | "-" | "" => Some(ReformStrength::None),
            t if t.eq_ignore_ascii_case("full") => Some(ReformStrength::Full),
            t if t.eq_ignore_ascii_case("partial") => Some(ReformStrength::Partial),
            t if t.eq_ignore_ascii_case("procedural") => Some(ReformStrength::Procedural),
            _ => Option::None,
        }
    }
}

impl fmt::Display for ReformStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReformStrength::None => write!(f, "—"),
            ReformStrength::Partial => write!(f, "Partial"),
            ReformStrength::Full => write!(f, "Full"),
            ReformStrength::Procedural => write!(f, "Procedural"),
        }
    }
}

/// One ledger row resolved to a generated series; annotation input for the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct ReformEvent {
    /// State name exactly as the ledger wrote it.
    pub state: String,
    pub enacted: Month,
    pub bill: String,
    /// Annotation anchor: the month the reform's legal effect begins.
    pub effective: Month,
    pub ftp_reform: ReformStrength,
    pub fta_reform: ReformStrength,
    /// Name of the StateSeries this event resolved to.
    pub series: String,
}

/// Error kinds tallied per state run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Extraction,
    MalformedRow,
    UnmappedCategory,
    DateParse,
    DateFormat,
}

/// Counts of recovered errors for one pipeline run, reported beside its output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunTally {
    pub extraction_errors: u64,
    pub malformed_rows: u64,
    pub unmapped_labels: u64,
    pub date_errors: u64,
    pub date_format_errors: u64,
    /// PDF pages that produced no parseable table structure.
    pub failed_pages: Vec<u32>,
}

impl RunTally {
    pub fn record(&mut self, kind: ErrorKind) {
        match kind {
            ErrorKind::Extraction => self.extraction_errors += 1,
            ErrorKind::MalformedRow => self.malformed_rows += 1,
            ErrorKind::UnmappedCategory => self.unmapped_labels += 1,
            ErrorKind::DateParse => self.date_errors += 1,
            ErrorKind::DateFormat => self.date_format_errors += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.extraction_errors
            + self.malformed_rows
            + self.unmapped_labels
            + self.date_errors
            + self.date_format_errors
    }
}

/// Terminal status of one state's pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Series produced and written.
    Ok,
    /// Run completed but no record survived extraction and normalization.
    Empty,
    /// File-level structural failure; other states are unaffected.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Ok => write!(f, "ok"),
            RunStatus::Empty => write!(f, "empty"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What one state's run produced, successful or not.
#[derive(Debug, Clone, Serialize)]
pub struct StateOutcome {
    pub state: String,
    pub status: RunStatus,
    /// Populated when `status == Failed`.
    pub failure: Option<String>,
    pub source_files: usize,
    pub records: u64,
    pub months: usize,
    pub tally: RunTally,
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_display() {
        let m = Month::new(2021, 6).unwrap();
        assert_eq!(m.to_string(), "2021-06");
    }

    #[test]
    fn test_month_year_round_trip() {
        let m = Month::parse_month_year("6/2021").unwrap();
        assert_eq!(m, Month::new(2021, 6).unwrap());
        assert_eq!(m.format_month_year(), "6/2021");
        assert_eq!(m.to_string(), "2021-06");
    }

    #[test]
    fn test_month_rejects_out_of_range() {
        assert!(Month::new(2020, 13).is_none());
        assert!(Month::parse_month_year("13/2020").is_none());
        assert!(Month::parse_month_year("6/21").is_none());
    }

    #[test]
    fn test_month_succ_wraps_year() {
        let dec = Month::new(2021, 12).unwrap();
        assert_eq!(dec.succ(), Month::new(2022, 1).unwrap());
        let jan = Month::new(2022, 1).unwrap();
        assert_eq!(jan.succ(), Month::new(2022, 2).unwrap());
    }

    #[test]
    fn test_month_ordering() {
        let a = Month::new(2020, 12).unwrap();
        let b = Month::new(2021, 1).unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_category_counts_total() {
        let mut counts = CategoryCounts::default();
        counts.add(CanonicalCategory::Ftp, 3);
        counts.add(CanonicalCategory::Fta, 2);
        counts.add(CanonicalCategory::RoadSafety, 1);
        counts.add(CanonicalCategory::Other, 4);
        assert_eq!(counts.total(), 10);

        let bucket = MonthlyBucket::new(Month::new(2021, 1).unwrap(), counts);
        let sum: u64 = CanonicalCategory::ALL
            .iter()
            .map(|c| bucket.counts.get(*c))
            .sum();
        assert_eq!(bucket.total, sum);
    }

    #[test]
    fn test_reform_strength_parse() {
        assert_eq!(ReformStrength::parse("Full"), Some(ReformStrength::Full));
        assert_eq!(ReformStrength::parse(" partial "), Some(ReformStrength::Partial));
        assert_eq!(ReformStrength::parse("Procedural"), Some(ReformStrength::Procedural));
        assert_eq!(ReformStrength::parse("—"), Some(ReformStrength::None));
        assert_eq!(ReformStrength::parse("banana"), None);
    }

    #[test]
    fn test_year_range() {
        let series = StateSeries {
            state: "Colorado".to_string(),
            buckets: vec![
                MonthlyBucket::new(Month::new(2019, 11).unwrap(), CategoryCounts::default()),
                MonthlyBucket::new(Month::new(2022, 2).unwrap(), CategoryCounts::default()),
            ],
        };
        assert_eq!(series.year_range(), Some("2019-2022".to_string()));
    }
}
