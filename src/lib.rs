pub mod aggregate;
pub mod args;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod pipelines;
pub mod range;
pub mod record;
pub mod utils;
pub mod views;

pub use aggregate::{aggregate, count_by, monthly_totals, Bucket, GroupKey, Measure, Reducer};
pub use args::Args;
pub use dashboard::{print_report, run_dashboard, DashboardReport};
pub use error::ConfigError;
pub use filter::{data_span, filter_in, filter_records, matching, CategoryFilter};
pub use pipelines::{init_default_pipelines, PipelineTable};
pub use range::{resolve, Clock, CustomRange, FixedClock, ResolvedRange, Selector, SystemClock};
pub use record::{FlatRecord, Record};
