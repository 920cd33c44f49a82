use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "suspension-trackr",
    about = "Normalize per-state license-suspension records into canonical monthly series",
    version
)]
pub struct Cli {
    /// Data root containing one folder of source files per state
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Pipeline config file [default: ./.suspension-trackr/config.toml, fallback ~/.config/suspension-trackr/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for canonical series files [default: <path>/Outputs]
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Reform ledger path [default: <path>/Reforms.txt]
    #[arg(long, value_name = "FILE")]
    pub reforms: Option<PathBuf>,

    /// Process only the named state (repeatable)
    #[arg(long = "state", value_name = "STATE")]
    pub states: Vec<String>,

    /// Fail records with unmapped category labels instead of bucketing them into Other
    #[arg(long)]
    pub strict: bool,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Show per-state detail tables even for clean runs
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}
