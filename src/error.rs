use thiserror::Error;

use crate::models::ErrorKind;

/// Row- and page-level failures recovered during a state's run.
///
/// These are tallied, not propagated: a record that trips one of these is
/// dropped and the run continues. File-level structural problems (an
/// unreadable workbook, a missing folder) travel as `anyhow::Error` instead
/// and fail that one state's pipeline.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no parseable table structure on page {page}")]
    Extraction { page: u32 },

    #[error("row {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("unmapped category label '{label}'")]
    UnmappedCategory { label: String },

    #[error("unparseable date '{value}' (expected {expected})")]
    DateParse { value: String, expected: &'static str },

    #[error("reform date '{value}' does not match M/YYYY")]
    DateFormat { value: String },
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::Extraction { .. } => ErrorKind::Extraction,
            SourceError::MalformedRow { .. } => ErrorKind::MalformedRow,
            SourceError::UnmappedCategory { .. } => ErrorKind::UnmappedCategory,
            SourceError::DateParse { .. } => ErrorKind::DateParse,
            SourceError::DateFormat { .. } => ErrorKind::DateFormat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = SourceError::MalformedRow { line: 7, expected: 3, found: 2 };
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
        assert_eq!(err.to_string(), "row 7: expected 3 fields, found 2");
    }

    #[test]
    fn test_date_parse_message() {
        let err = SourceError::DateParse {
            value: "13/2020".to_string(),
            expected: "M/D/YYYY",
        };
        assert_eq!(err.kind(), ErrorKind::DateParse);
        assert!(err.to_string().contains("13/2020"));
    }
}
