use time::macros::format_description;
use tracing::warn;
use tracing_subscriber::{fmt::time::LocalTime, EnvFilter};

use crate::record::parse_timestamp;

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_writer(std::io::stderr)
        .init();
}

pub fn format_number(num: usize) -> String {
    let digits = num.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Whole-unit amount with thousands separators, e.g. `-1,250`. Values that
/// are not finite or do not fit a `usize` are printed as-is.
pub fn format_amount(amount: f64) -> String {
    let rounded = amount.round();
    if !rounded.is_finite() || rounded.abs() >= usize::MAX as f64 {
        return format!("{}", rounded);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{}{}", sign, format_number(rounded.abs() as usize))
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if args.init {
        return Ok(());
    }

    if args.input.is_none() {
        anyhow::bail!("--input is required unless --init is given");
    }

    if args.page == 0 {
        anyhow::bail!("--page must be greater than 0");
    }

    if let Some(now) = &args.now {
        if parse_timestamp(now).is_none() {
            anyhow::bail!("--now must be a date (YYYY-MM-DD) or date-time, got '{}'", now);
        }
    }

    if args.from.is_some() != args.to.is_some() {
        warn!(
            action = "validate",
            component = "arguments",
            "Custom range needs both --from and --to; showing all records"
        );
    }

    if args.no_pipelines && args.pipelines.is_some() {
        anyhow::bail!("--pipelines cannot be combined with --no-pipelines");
    }

    Ok(())
}
