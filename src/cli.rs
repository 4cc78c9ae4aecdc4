use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Validate and remediate CSV datasets against declarative column rules",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply a rule set and write cleaned rows, removed rows, stats, and reports
    Clean(CleanArgs),
    /// Audit a CSV file against a rule set without modifying anything
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Rule set file (YAML, or JSON when the extension is .json)
    #[arg(short, long, default_value = "config/rules.yml")]
    pub rules: PathBuf,
    /// Input CSV file ('-' reads stdin)
    #[arg(short, long, default_value = "data/raw/sample_data.csv")]
    pub input: PathBuf,
    /// Destination for rows that survived cleaning
    #[arg(short, long, default_value = "data/processed/cleaned_data.csv")]
    pub output: PathBuf,
    /// Destination for removed rows and their reasons
    #[arg(long, default_value = "data/processed/removed_rows.csv")]
    pub removed: PathBuf,
    /// Quality report for the cleaned output
    #[arg(long, default_value = "reports/quality_report.md")]
    pub report: PathBuf,
    /// Quality report for the raw input
    #[arg(long = "raw-report", default_value = "reports/quality_report_raw.md")]
    pub raw_report: PathBuf,
    /// Cleaning statistics as JSON
    #[arg(long, default_value = "reports/cleaning_stats.json")]
    pub stats: PathBuf,
    /// Sort directives such as `Category:asc,Amount:desc`; replaces the rule set's sort section
    #[arg(long = "sort", action = clap::ArgAction::Append)]
    pub sort: Vec<String>,
    /// Keep rows in input order
    #[arg(long = "no-sort", conflicts_with = "sort")]
    pub no_sort: bool,
    /// Skip writing the markdown quality reports
    #[arg(long = "no-reports")]
    pub no_reports: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Rule set file (YAML, or JSON when the extension is .json)
    #[arg(short, long, default_value = "config/rules.yml")]
    pub rules: PathBuf,
    /// Input CSV file ('-' reads stdin)
    #[arg(short, long)]
    pub input: PathBuf,
    /// Write the markdown report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
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
