//! Command-line interface definitions for Title Ledger.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Pipeline settings come from an optional YAML file; flags given here take
//! precedence over it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use title_ledger::{Order, PipelineConfig};

/// Command-line arguments for the Title Ledger application.
///
/// # Examples
///
/// ```sh
/// # Collect titles for every URL in targets.txt
/// title_ledger run --sources automation/targets.txt
///
/// # Full-text search over everything collected so far
/// title_ledger search --fulltext "election results"
///
/// # Fail the CI job when today's run added nothing
/// title_ledger quality --min-new-rows 1
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML pipeline config
    #[arg(short, long, global = true, env = "TITLE_LEDGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cumulative store file (overrides the config)
    #[arg(short, long, global = true, env = "TITLE_LEDGER_STORE")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch every source once and update the snapshot and store
    Run(RunArgs),
    /// Query the cumulative store
    Search(SearchArgs),
    /// Check the store against data quality rules
    Quality(QualityArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Newline-delimited list of URLs to fetch
    #[arg(long, default_value = "automation/targets.txt")]
    pub sources: PathBuf,

    /// Daily snapshot path template containing `{date}`
    #[arg(long)]
    pub snapshot_template: Option<String>,

    /// Attempts per URL, including the first
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Number of URLs fetched at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Abort URLs still pending after this many milliseconds
    #[arg(long)]
    pub run_timeout_ms: Option<u64>,

    /// Print run statistics as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(t) = &self.snapshot_template {
            config.daily_snapshot_path_template = t.clone();
        }
        if let Some(n) = self.max_attempts {
            config.max_attempts = n;
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        if let Some(n) = self.concurrency {
            config.concurrency = n;
        }
        if let Some(ms) = self.run_timeout_ms {
            config.run_timeout_ms = Some(ms);
        }
    }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Titles equal to TEXT after normalization
    #[arg(long, value_name = "TEXT", conflicts_with_all = ["fulltext", "q"])]
    pub exact: Option<String>,

    /// Titles containing every word of TEXT, best match first
    #[arg(long, value_name = "TEXT", conflicts_with = "q")]
    pub fulltext: Option<String>,

    /// Keyword (case-insensitive substring match)
    #[arg(long)]
    pub q: Option<String>,

    /// Inclusive lower bound, e.g. 2025-10-01 or 2025-10-01T00:00:00
    #[arg(long, value_parser = parse_timestamp)]
    pub date_from: Option<DateTime<Utc>>,

    /// Exclusive upper bound, e.g. 2025-11-01 or 2025-11-01T00:00:00
    #[arg(long, value_parser = parse_timestamp)]
    pub date_to: Option<DateTime<Utc>>,

    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    #[arg(long, value_enum, default_value_t = SortOrder::Desc)]
    pub order: SortOrder,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub fmt: OutputFormat,
}

#[derive(Args, Debug)]
pub struct QualityArgs {
    /// Minimum records collected today
    #[arg(long, env = "QC_MIN_NEW_ROWS", default_value_t = 1)]
    pub min_new_rows: usize,

    /// Maximum share of records repeating a URL
    #[arg(long, env = "QC_MAX_DUP_RATE", default_value_t = 0.10)]
    pub max_dup_rate: f64,

    #[arg(long)]
    pub allow_empty_title: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl From<SortOrder> for Order {
    fn from(o: SortOrder) -> Self {
        match o {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Accept RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (read as UTC), or a bare
/// date (midnight UTC).
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(format!("not a timestamp: {s}"))
}
