use std::collections::BTreeMap;

use crate::dates::DateFormat;
use crate::models::{
    CanonicalCategory, CategoryCounts, Month, MonthlyBucket, RawRecord, RunTally, StateSeries,
};

/// Options the aggregator takes from the state's configuration.
#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    pub date_format: DateFormat,
    /// Records dated outside these years are dropped and tallied; agency
    /// exports use sentinel dates (9999-12-31) for open-ended records.
    pub min_year: i32,
    pub max_year: i32,
    /// Fill gap months with zero-valued buckets. Only for states whose
    /// source is known to report every month.
    pub zero_fill: bool,
}

/// Bucket normalized records into calendar months.
///
/// Dates that fail to parse are dropped and counted in the run tally; the
/// remaining records are summed per category per month. Buckets come out
/// strictly ascending with no duplicate months.
pub fn aggregate(
    state: &str,
    records: &[(RawRecord, CanonicalCategory)],
    options: AggregateOptions,
    tally: &mut RunTally,
) -> StateSeries {
    let mut by_month: BTreeMap<Month, CategoryCounts> = BTreeMap::new();

    for (record, category) in records {
        let month = match options.date_format.parse_month(&record.raw_date) {
            Ok(m) => m,
            Err(err) => {
                tally.record(err.kind());
                continue;
            }
        };
        if month.year < options.min_year || month.year > options.max_year {
            tally.record(crate::models::ErrorKind::DateParse);
            continue;
        }
        by_month.entry(month).or_default().add(*category, record.count);
    }

    if options.zero_fill {
        if let (Some(&first), Some(&last)) =
            (by_month.keys().next(), by_month.keys().next_back())
        {
            let mut m = first;
            while m < last {
                by_month.entry(m).or_default();
                m = m.succ();
            }
        }
    }

    StateSeries {
        state: state.to_string(),
        buckets: by_month
            .into_iter()
            .map(|(month, counts)| MonthlyBucket::new(month, counts))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> AggregateOptions {
        AggregateOptions {
            date_format: DateFormat::MonthYear,
            min_year: 1970,
            max_year: 2025,
            zero_fill: false,
        }
    }

    fn record(raw_date: &str, count: u64) -> RawRecord {
        RawRecord {
            state: "Testonia".to_string(),
            raw_date: raw_date.to_string(),
            raw_label: "x".to_string(),
            count,
        }
    }

    #[test]
    fn test_sums_per_category_per_month() {
        let records = vec![
            (record("1/2021", 5), CanonicalCategory::Ftp),
            (record("1/2021", 3), CanonicalCategory::Ftp),
            (record("1/2021", 2), CanonicalCategory::Fta),
            (record("2/2021", 7), CanonicalCategory::RoadSafety),
        ];
        let mut tally = RunTally::default();
        let series = aggregate("Testonia", &records, options(), &mut tally);

        assert_eq!(series.buckets.len(), 2);
        let jan = &series.buckets[0];
        assert_eq!(jan.month.to_string(), "2021-01");
        assert_eq!(jan.counts.ftp, 8);
        assert_eq!(jan.counts.fta, 2);
        assert_eq!(jan.total, 10);
        assert_eq!(series.buckets[1].counts.road_safety, 7);
        assert_eq!(tally.total(), 0);
    }

    #[test]
    fn test_invalid_month_dropped_and_tallied() {
        let records = vec![
            (record("13/2020", 4), CanonicalCategory::Ftp),
            (record("6/2020", 4), CanonicalCategory::Ftp),
        ];
        let mut tally = RunTally::default();
        let series = aggregate("Testonia", &records, options(), &mut tally);

        assert_eq!(series.buckets.len(), 1);
        assert_eq!(series.buckets[0].month.to_string(), "2020-06");
        assert_eq!(tally.date_errors, 1);
    }

    #[test]
    fn test_out_of_bounds_year_dropped() {
        let records = vec![
            (record("12/9999", 1), CanonicalCategory::Other),
            (record("1/1950", 1), CanonicalCategory::Other),
            (record("1/2020", 1), CanonicalCategory::Other),
        ];
        let mut tally = RunTally::default();
        let series = aggregate("Testonia", &records, options(), &mut tally);
        assert_eq!(series.buckets.len(), 1);
        assert_eq!(tally.date_errors, 2);
    }

    #[test]
    fn test_months_strictly_ascending_and_unique() {
        let records = vec![
            (record("3/2021", 1), CanonicalCategory::Ftp),
            (record("1/2021", 1), CanonicalCategory::Ftp),
            (record("3/2021", 1), CanonicalCategory::Fta),
            (record("12/2020", 1), CanonicalCategory::Other),
        ];
        let mut tally = RunTally::default();
        let series = aggregate("Testonia", &records, options(), &mut tally);
        let months: Vec<String> = series.buckets.iter().map(|b| b.month.to_string()).collect();
        assert_eq!(months, ["2020-12", "2021-01", "2021-03"]);
        for pair in series.buckets.windows(2) {
            assert!(pair[0].month < pair[1].month);
        }
    }

    #[test]
    fn test_zero_fill_bridges_gaps() {
        let mut opts = options();
        opts.zero_fill = true;
        let records = vec![
            (record("11/2020", 2), CanonicalCategory::Ftp),
            (record("2/2021", 3), CanonicalCategory::Ftp),
        ];
        let mut tally = RunTally::default();
        let series = aggregate("Testonia", &records, opts, &mut tally);
        let months: Vec<String> = series.buckets.iter().map(|b| b.month.to_string()).collect();
        assert_eq!(months, ["2020-11", "2020-12", "2021-01", "2021-02"]);
        assert_eq!(series.buckets[1].total, 0);
        assert_eq!(series.buckets[2].total, 0);
    }

    #[test]
    fn test_no_zero_fill_by_default() {
        let records = vec![
            (record("11/2020", 2), CanonicalCategory::Ftp),
            (record("2/2021", 3), CanonicalCategory::Ftp),
        ];
        let mut tally = RunTally::default();
        let series = aggregate("Testonia", &records, options(), &mut tally);
        assert_eq!(series.buckets.len(), 2);
    }

    #[test]
    fn test_total_invariant_holds() {
        let records = vec![
            (record("5/2021", 3), CanonicalCategory::Ftp),
            (record("5/2021", 1), CanonicalCategory::Fta),
            (record("5/2021", 4), CanonicalCategory::RoadSafety),
            (record("5/2021", 2), CanonicalCategory::Other),
        ];
        let mut tally = RunTally::default();
        let series = aggregate("Testonia", &records, options(), &mut tally);
        let bucket = &series.buckets[0];
        let sum: u64 = CanonicalCategory::ALL.iter().map(|c| bucket.counts.get(*c)).sum();
        assert_eq!(bucket.total, sum);
        assert_eq!(bucket.total, 10);
    }
}
