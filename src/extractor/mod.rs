use std::path::Path;

use anyhow::Result;

use crate::config::{SourceFormat, StateConfig};
use crate::error::SourceError;
use crate::models::RawRecord;

pub mod delimited;
pub mod pdf;
pub mod spreadsheet;

/// What one source file yielded.
///
/// Row- and page-level failures are recovered into `skipped` rather than
/// aborting the file; only structural failures (unreadable workbook,
/// unresolvable column binding) surface as an `Err` from [`Extractor::extract`].
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<RawRecord>,
    pub skipped: Vec<SourceError>,
    /// PDF pages on which no table structure was found.
    pub failed_pages: Vec<u32>,
}

impl Extraction {
    pub fn absorb(&mut self, other: Extraction) {
        self.records.extend(other.records);
        self.skipped.extend(other.skipped);
        self.failed_pages.extend(other.failed_pages);
    }
}

/// One source-format adapter. Each call re-reads the file; the produced
/// sequence is finite and not restartable.
pub trait Extractor {
    fn extract(&self, path: &Path) -> Result<Extraction>;

    /// File extensions this adapter consumes (lower-case, no dot).
    fn extensions(&self) -> &'static [&'static str];
}

/// Adapter for a state, per its configured format.
pub fn extractor_for(state: &str, config: &StateConfig) -> Box<dyn Extractor> {
    match config.format {
        SourceFormat::Spreadsheet => Box::new(spreadsheet::SpreadsheetExtractor::new(
            state.to_string(),
            config.clone(),
        )),
        SourceFormat::Pdf => Box::new(pdf::PdfExtractor::new(state.to_string(), config.clone())),
        SourceFormat::Delimited => Box::new(delimited::DelimitedExtractor::new(
            state.to_string(),
            config.clone(),
        )),
    }
}
