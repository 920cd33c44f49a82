use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

use crate::category::vocabulary::Vocabulary;
use crate::dates::DateFormat;
use crate::models::CanonicalCategory;

/// Root configuration, deserialized from `.suspension-trackr/config.toml`.
///
/// Each state is one `[states.<Name>]` table: the generic pipeline reads
/// the table and behaves accordingly, so adding a state means adding
/// configuration, not code.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub states: BTreeMap<String, StateConfig>,
}

/// How one state's source files are shaped and interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// Source file format. Fixed per state; never auto-detected.
    pub format: SourceFormat,

    /// Folder under the data root holding this state's files.
    /// Defaults to the state name.
    #[serde(default)]
    pub folder: Option<String>,

    /// Row layout for spreadsheet sources.
    #[serde(default)]
    pub layout: Layout,

    /// Read only this sheet, when set.
    #[serde(default)]
    pub sheet: Option<String>,

    /// Otherwise, read only sheets whose name starts with this prefix.
    #[serde(default)]
    pub sheet_prefix: Option<String>,

    /// Shape of this state's date fields.
    #[serde(default = "default_date_format")]
    pub date_format: DateFormat,

    /// Column bindings for long layouts and delimited files.
    #[serde(default)]
    pub columns: ColumnSpec,

    /// Field delimiter for delimited sources. Defaults to comma.
    #[serde(default)]
    pub delimiter: Option<char>,

    /// Whether delimited sources carry a header row.
    #[serde(default = "default_true")]
    pub has_headers: bool,

    /// First page holding tabular data in PDF sources (1-based).
    #[serde(default)]
    pub start_page: Option<u32>,

    /// Reject unmapped labels instead of folding them into Other.
    #[serde(default)]
    pub strict_labels: bool,

    /// Emit zero-valued buckets for gap months. Only set for states whose
    /// source is known to report every month.
    #[serde(default)]
    pub zero_fill: bool,

    /// Records dated outside these years are dropped and tallied.
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    #[serde(default = "default_max_year")]
    pub max_year: i32,

    /// This state's label vocabulary.
    #[serde(default)]
    pub vocabulary: Vocabulary,
}

fn default_date_format() -> DateFormat {
    DateFormat::YearMonthDay
}

fn default_true() -> bool {
    true
}

fn default_min_year() -> i32 {
    1970
}

fn default_max_year() -> i32 {
    2025
}

impl StateConfig {
    pub fn folder_for(&self, state: &str) -> String {
        self.folder.clone().unwrap_or_else(|| state.to_string())
    }

    fn new(format: SourceFormat) -> Self {
        StateConfig {
            format,
            folder: None,
            layout: Layout::default(),
            sheet: None,
            sheet_prefix: None,
            date_format: default_date_format(),
            columns: ColumnSpec::default(),
            delimiter: None,
            has_headers: true,
            start_page: None,
            strict_labels: false,
            zero_fill: false,
            min_year: default_min_year(),
            max_year: default_max_year(),
            vocabulary: Vocabulary::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Spreadsheet,
    Pdf,
    Delimited,
}

/// Spreadsheet row layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// One record per row; date/label/count bound by [`ColumnSpec`].
    #[default]
    Long,
    /// Rows keyed by a month column, one column per raw label, cells are counts.
    Wide,
    /// One sheet per month: month from the tab name, year from the file name,
    /// label and count columns within each sheet.
    SheetMonth,
}

/// A column referenced by header name or zero-based position.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Name(String),
    Index(usize),
}

/// Which columns hold what, for long layouts and delimited files.
///
/// Either `date`, or the `month` + `year` pair, locates the record in time.
/// A missing `count` column means each row counts one event (per-person
/// source files).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColumnSpec {
    pub date: Option<ColumnRef>,
    pub month: Option<ColumnRef>,
    pub year: Option<ColumnRef>,
    pub label: Option<ColumnRef>,
    pub count: Option<ColumnRef>,
}

impl Config {
    /// Built-in multi-state setup used when no config file is found.
    ///
    /// Covers the states whose source layouts the pipeline was written
    /// against; a config file with the same table shapes overrides it.
    pub fn builtin() -> Self {
        let mut states = BTreeMap::new();

        // Sheet-per-month workbooks; explicit action-code overrides from the
        // DMV's hearing-action glossary, keywords for the rest.
        let mut colorado = StateConfig::new(SourceFormat::Spreadsheet);
        colorado.layout = Layout::SheetMonth;
        colorado.date_format = DateFormat::YearMonth;
        colorado.vocabulary = Vocabulary::with_common_keywords()
            .code("SFTC", CanonicalCategory::Ftp)
            .code("CDOF", CanonicalCategory::Ftp)
            .code("SNRV", CanonicalCategory::Ftp)
            .code("CDJD", CanonicalCategory::Fta)
            .code("CDOJ", CanonicalCategory::Fta)
            .code("CDUR", CanonicalCategory::Fta)
            .code("CDHT", CanonicalCategory::Other)
            .code("RAOC", CanonicalCategory::RoadSafety)
            .code("RAON", CanonicalCategory::RoadSafety)
            .code("RAOH", CanonicalCategory::RoadSafety)
            .code("RLSN", CanonicalCategory::RoadSafety)
            .code("RLSC", CanonicalCategory::RoadSafety)
            .code("RDRC", CanonicalCategory::RoadSafety)
            .code("RDUI", CanonicalCategory::RoadSafety)
            .code("SDUI", CanonicalCategory::RoadSafety)
            .code("SHAR", CanonicalCategory::RoadSafety)
            .code("RVAS", CanonicalCategory::RoadSafety)
            .code("RVHM", CanonicalCategory::RoadSafety);
        states.insert("Colorado".to_string(), colorado);

        // Monthly matrix: rows are M/YYYY, columns are vehicle-code sections.
        let mut illinois = StateConfig::new(SourceFormat::Spreadsheet);
        illinois.layout = Layout::Wide;
        illinois.sheet = Some("Sheet2".to_string());
        illinois.date_format = DateFormat::MonthYear;
        let mut vocab = Vocabulary::with_common_keywords();
        // 6-206(a)1..5 are appearance-related withdrawals; the rest of
        // 6-206 is pay/comply. 6-205 and 11-501 are DUI statutes.
        vocab.fta_keywords.insert(0, "6-206(a)".to_string());
        vocab.ftp_keywords.insert(0, "6-206".to_string());
        vocab.road_safety_keywords.insert(0, "6-205".to_string());
        vocab.road_safety_keywords.insert(0, "11-501".to_string());
        illinois.vocabulary = vocab;
        states.insert("Illinois".to_string(), illinois);

        // Long layout with split month-name and year columns.
        let mut texas = StateConfig::new(SourceFormat::Spreadsheet);
        texas.sheet = Some("EAs & EA Status".to_string());
        texas.date_format = DateFormat::MonthName;
        texas.min_year = 2010;
        texas.columns = ColumnSpec {
            date: None,
            month: Some(ColumnRef::Name("Month".to_string())),
            year: Some(ColumnRef::Name("Year of Enforcement Action".to_string())),
            label: Some(ColumnRef::Name("Enforcement Action".to_string())),
            count: Some(ColumnRef::Name("Count".to_string())),
        };
        let mut vocab = Vocabulary::with_common_keywords();
        for kw in ["alr", "administrative per se", "dwli", "evade arrest", "flee police"] {
            vocab.road_safety_keywords.push(kw.to_string());
        }
        vocab.ftp_keywords.push("default installment agreement".to_string());
        vocab.ftp_keywords.push("dhs overpayment".to_string());
        texas.vocabulary = vocab;
        states.insert("Texas".to_string(), texas);

        // Per-person sanction dump: one row per suspension, no count column.
        let mut new_york = StateConfig::new(SourceFormat::Delimited);
        new_york.folder = Some("New York".to_string());
        new_york.date_format = DateFormat::MonthDayYear;
        new_york.columns = ColumnSpec {
            date: Some(ColumnRef::Name("EFFECTIVE".to_string())),
            month: None,
            year: None,
            label: Some(ColumnRef::Name("REASON".to_string())),
            count: None,
        };
        new_york.vocabulary = Vocabulary::with_common_keywords();
        states.insert("NewYork".to_string(), new_york);

        // Per-person restraint dump keyed by sanction code.
        let mut minnesota = StateConfig::new(SourceFormat::Delimited);
        minnesota.date_format = DateFormat::YearMonthDay;
        minnesota.columns = ColumnSpec {
            date: Some(ColumnRef::Name("fdtmRestraintCommence".to_string())),
            month: None,
            year: None,
            label: Some(ColumnRef::Name("Sanction Code".to_string())),
            count: None,
        };
        let mut vocab = Vocabulary::with_common_keywords()
            .code("SD45", CanonicalCategory::Fta)
            .code("SA12", CanonicalCategory::Fta)
            .code("SD51", CanonicalCategory::Ftp)
            .code("SD53", CanonicalCategory::Ftp)
            .code("SD56", CanonicalCategory::Ftp);
        for code in [
            "SA90", "SA98", "SA21", "SA22", "SA33", "SA91", "SA95", "SA11", "SA61",
            "SB20", "SB25", "SB26", "SB51", "SB22", "SB74", "SD35", "SD36", "SD39",
            "SD27", "SD29", "SD16", "SW00", "SW01", "SW72", "SU01", "SU03", "SU04",
            "SU06",
        ] {
            vocab = vocab.code(code, CanonicalCategory::RoadSafety);
        }
        minnesota.vocabulary = vocab;
        states.insert("Minnesota".to_string(), minnesota);

        // Statewide activity report: tabular region begins deep in the file.
        let mut new_mexico = StateConfig::new(SourceFormat::Pdf);
        new_mexico.folder = Some("New Mexico".to_string());
        new_mexico.date_format = DateFormat::YearMonth;
        new_mexico.start_page = Some(1786);
        new_mexico.vocabulary = Vocabulary::with_common_keywords()
            .code("D45", CanonicalCategory::Fta)
            .code("D51", CanonicalCategory::Ftp)
            .code("D53", CanonicalCategory::Ftp)
            .code("D56", CanonicalCategory::Ftp)
            .code("A21", CanonicalCategory::RoadSafety)
            .code("A12", CanonicalCategory::RoadSafety)
            .code("A98", CanonicalCategory::RoadSafety)
            .code("A20", CanonicalCategory::RoadSafety)
            .code("A11", CanonicalCategory::RoadSafety)
            .code("A22", CanonicalCategory::RoadSafety)
            .code("A23", CanonicalCategory::RoadSafety)
            .code("B25", CanonicalCategory::RoadSafety)
            .code("B26", CanonicalCategory::RoadSafety)
            .code("B05", CanonicalCategory::RoadSafety);
        states.insert("NewMexico".to_string(), new_mexico);

        Config { states }
    }
}

/// Load the pipeline configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<data_root>/.suspension-trackr/config.toml`
/// 3. `~/.config/suspension-trackr/config.toml`
/// 4. Built-in [`Config::builtin`]
pub fn load_config(data_root: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        let content = std::fs::read_to_string(path)?;
        return Ok(toml::from_str(&content)?);
    }

    let project_config = data_root.join(".suspension-trackr").join("config.toml");
    if project_config.exists() {
        let content = std::fs::read_to_string(&project_config)?;
        return Ok(toml::from_str(&content)?);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("suspension-trackr")
            .join("config.toml");
        if home_config.exists() {
            let content = std::fs::read_to_string(&home_config)?;
            return Ok(toml::from_str(&content)?);
        }
    }

    Ok(Config::builtin())
}
