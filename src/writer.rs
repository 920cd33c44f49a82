use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;

use crate::models::{CategoryCounts, StateSeries};

/// Write one state's canonical series: `time,FTP,FTA,road_safety,Other,total`,
/// one row per month, ascending. Pure serialization; the series arrives
/// already ordered and summed.
pub fn write_series(series: &StateSeries, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    writer.write_record(["time", "FTP", "FTA", "road_safety", "Other", "total"])?;
    for bucket in &series.buckets {
        writer.write_record([
            bucket.month.to_string(),
            bucket.counts.ftp.to_string(),
            bucket.counts.fta.to_string(),
            bucket.counts.road_safety.to_string(),
            bucket.counts.other.to_string(),
            bucket.total.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the cross-state summary (`All.csv`): one row per state with its
/// year span and category totals across the whole series.
pub fn write_summary(series: &[StateSeries], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    writer.write_record(["State", "Years", "FTP", "FTA", "road_safety", "Other", "total"])?;

    let mut ordered: Vec<&StateSeries> = series.iter().collect();
    ordered.sort_by(|a, b| a.state.cmp(&b.state));

    for s in ordered {
        let mut totals = CategoryCounts::default();
        for bucket in &s.buckets {
            totals.merge(&bucket.counts);
        }
        writer.write_record([
            s.state.clone(),
            s.year_range().unwrap_or_else(|| "Unknown".to_string()),
            totals.ftp.to_string(),
            totals.fta.to_string(),
            totals.road_safety.to_string(),
            totals.other.to_string(),
            totals.total().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CanonicalCategory, Month, MonthlyBucket};

    fn series() -> StateSeries {
        let mut jan = CategoryCounts::default();
        jan.add(CanonicalCategory::Ftp, 8);
        jan.add(CanonicalCategory::Fta, 2);
        let mut feb = CategoryCounts::default();
        feb.add(CanonicalCategory::RoadSafety, 5);
        StateSeries {
            state: "Colorado".to_string(),
            buckets: vec![
                MonthlyBucket::new(Month::new(2021, 1).unwrap(), jan),
                MonthlyBucket::new(Month::new(2021, 2).unwrap(), feb),
            ],
        }
    }

    #[test]
    fn test_series_schema_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Colorado.csv");
        write_series(&series(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "time,FTP,FTA,road_safety,Other,total");
        assert_eq!(lines[1], "2021-01,8,2,0,0,10");
        assert_eq!(lines[2], "2021-02,0,0,5,0,5");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_series_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Empty.csv");
        let empty = StateSeries { state: "Empty".to_string(), buckets: vec![] };
        write_series(&empty, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "time,FTP,FTA,road_safety,Other,total");
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Colorado.csv");
        write_series(&series(), &path).unwrap();
        let first = std::fs::read(&path).unwrap();
        write_series(&series(), &path).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary_sorted_by_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("All.csv");
        let mut other = series();
        other.state = "Alaska".to_string();
        write_summary(&[series(), other], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "State,Years,FTP,FTA,road_safety,Other,total"
        );
        assert!(lines[1].starts_with("Alaska,2021-2021,"));
        assert!(lines[2].starts_with("Colorado,2021-2021,8,2,5,0,15"));
    }
}
