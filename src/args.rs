use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    Deals,
    Leads,
    Projects,
}

#[derive(Parser, Debug)]
#[command(
    name = "dashlens",
    about = "Slice CRM records by date range and summarize them for dashboard charts",
    version,
    long_about = None
)]
pub struct Args {
    /// JSON file holding an array of records
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Dashboard to render
    #[arg(short, long, value_enum, default_value_t = Dashboard::Deals)]
    pub dashboard: Dashboard,

    /// Date range for the chart panels (AllTime, Today, Yesterday, Last5Days,
    /// Last7Days, Last15Days, Last30Days, OneMonth, Last3Months, ThisMonth,
    /// LastMonth, Custom)
    #[arg(short, long)]
    pub range: Option<String>,

    /// Date range for the recent list, defaults to --range
    #[arg(long)]
    pub recent_range: Option<String>,

    /// Date range for the stage breakdowns, defaults to --range
    #[arg(long)]
    pub stage_range: Option<String>,

    /// First day of a Custom range (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day of a Custom range (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Reference date or date-time to use instead of the current time
    #[arg(long)]
    pub now: Option<String>,

    /// Pipeline label applied to every pipeline filter
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Path to custom pipeline mapping file
    #[arg(long)]
    pub pipelines: Option<PathBuf>,

    /// Disable pipeline label expansion
    #[arg(long)]
    pub no_pipelines: bool,

    /// Page of the recent list to show
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Initialize pipelines.txt with default mappings
    #[arg(long)]
    pub init: bool,
}
