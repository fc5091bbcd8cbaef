use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{dashboard::Dashboard, filter::FilterSelection, period, roles::Role};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Filter and chart monthly resident population and household CSV exports",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show population/household totals and the period, age-sex and region breakdowns
    Summary(SummaryArgs),
    /// List the values each filter control can choose from
    Candidates(CandidatesArgs),
    /// Write the filtered rows as a UTF-8 (BOM) CSV download
    Export(ExportArgs),
    /// Preview the first rows of the raw dataset in a formatted table
    Preview(PreviewArgs),
    /// Read filter changes from stdin and re-render the summary after each one
    Explore(ExploreArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV file (encoding is detected automatically)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Debug, Args, Default)]
pub struct FilterArgs {
    /// Region-major (시도) values to keep
    #[arg(long = "region-major", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub region_major: Vec<String>,
    /// Region-minor (시군구) values to keep
    #[arg(long = "region-minor", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub region_minor: Vec<String>,
    /// Sex values to keep
    #[arg(long = "sex", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub sex: Vec<String>,
    /// Age-band values to keep
    #[arg(long = "age-band", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub age_band: Vec<String>,
    /// First month/day of the period range (YYYY-MM-DD, YYYY-MM or YYYYMM)
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,
    /// Last month/day of the period range (YYYY-MM-DD, YYYY-MM or YYYYMM)
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,
    /// Start from the dashboard's opening selection; explicit flags override it
    #[arg(long)]
    pub defaults: bool,
}

impl FilterArgs {
    pub fn selection(&self, dashboard: &Dashboard) -> FilterSelection {
        let mut selection = if self.defaults {
            dashboard.initial_selection()
        } else {
            FilterSelection::new()
        };
        for (role, values) in [
            (Role::RegionMajor, &self.region_major),
            (Role::RegionMinor, &self.region_minor),
            (Role::Sex, &self.sex),
            (Role::AgeBand, &self.age_band),
        ] {
            let values = values
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>();
            if !values.is_empty() {
                selection = selection.with_values(role, values);
            }
        }
        if self.start.is_some() || self.end.is_some() {
            let start = self.start.or(selection.start());
            let end = self.end.or(selection.end());
            selection = selection.with_period(start, end);
        }
        selection
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Render as aligned tables or as JSON for an external charting tool
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct CandidatesArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Render as an aligned table or as JSON
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Destination file (overrides --output-dir)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Directory receiving the fixed-name download file
    #[arg(long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 200)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    period::parse_date_bound(value).map_err(|err| err.to_string())
}
