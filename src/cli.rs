//! Command-line interface.

use crate::config::Config;
use crate::models::SortKey;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// A terminal dashboard for browsing RAM prices.
///
/// ramtop lists memory-module price listings from a price-tracker backend,
/// lets you search, sort and page through them, opt listings into price
/// tracking, and plot each listing's price history.
#[derive(Parser, Debug, Clone)]
#[command(name = "ramtop")]
#[command(version)]
#[command(about = "A terminal dashboard for RAM prices", long_about = None)]
pub struct Args {
    /// Base URL of the price-tracker API
    #[arg(short = 'u', long, env = "RAMTOP_API_URL")]
    pub api_url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "RAMTOP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Initial sort field
    #[arg(short = 'o', long, value_enum)]
    pub sort: Option<SortField>,

    /// Sort descending instead of ascending
    #[arg(short = 'r', long)]
    pub reverse: bool,

    /// Initial search text, matched against listing names
    #[arg(short = 'f', long)]
    pub filter: Option<String>,

    /// Listings per page (0 = one unpaginated table)
    #[arg(short = 'p', long)]
    pub page_size: Option<usize>,

    /// Currency marker shown with prices
    #[arg(long)]
    pub currency: Option<String>,

    /// API timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Batch mode - print the listings once and exit
    #[arg(short = 'b', long)]
    pub batch: bool,

    /// Output format for batch mode
    #[arg(long, value_enum, default_value = "text")]
    pub export: ExportFormat,

    /// Print the price history of one listing and exit
    #[arg(long, value_name = "ID")]
    pub history: Option<i64>,

    /// With --history, print every scraped observation instead of the chart series
    #[arg(long, requires = "history")]
    pub raw: bool,

    /// Append logs to this file
    #[arg(long, env = "RAMTOP_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub print_config: bool,

    /// Write a sample configuration file to the default location and exit
    #[arg(long)]
    pub init_config: bool,

    /// Verbose output - debug-level logs
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Sort field options.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SortField {
    /// Sort by manufacturer
    Brand,
    /// Sort by listing name
    Name,
    /// Sort by capacity
    Capacity,
    /// Sort by rated speed
    Speed,
    /// Sort by CAS latency
    Latency,
    /// Sort by latest price (default)
    Price,
    /// Sort by availability
    Status,
    /// Sort by scrape time
    LastUpdated,
}

impl From<SortField> for SortKey {
    fn from(field: SortField) -> Self {
        match field {
            SortField::Brand => SortKey::Brand,
            SortField::Name => SortKey::Name,
            SortField::Capacity => SortKey::Capacity,
            SortField::Speed => SortKey::Speed,
            SortField::Latency => SortKey::Latency,
            SortField::Price => SortKey::Price,
            SortField::Status => SortKey::Status,
            SortField::LastUpdated => SortKey::LastUpdated,
        }
    }
}

/// Export format for batch output.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Aligned plain-text table
    #[default]
    Text,
    /// Comma-separated values (CSV)
    Csv,
    /// JavaScript Object Notation (JSON)
    Json,
}

impl Args {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref url) = self.api_url {
            config.api.base_url = url.clone();
        }
        if let Some(timeout) = self.timeout {
            config.api.timeout = timeout;
        }
        if let Some(page_size) = self.page_size {
            config.display.page_size = page_size;
        }
        if let Some(ref currency) = self.currency {
            config.display.currency = currency.clone();
        }
        if let Some(sort) = self.sort {
            config.display.sort_by = SortKey::from(sort).field_name().to_string();
        }
        if self.reverse {
            config.display.sort_descending = true;
        }
        if let Some(ref file) = self.log_file {
            config.logging.file = Some(file.clone());
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
    }
}
