use anyhow::Result;
use clap::Parser;
use tracing::error;

use dashlens::range::SystemClock;
use dashlens::utils::{setup_logging, validate_args};
use dashlens::{init_default_pipelines, print_report, run_dashboard, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    validate_args(&args)?;

    if args.init {
        return init_default_pipelines();
    }

    match run_dashboard(&args, &SystemClock) {
        Ok(report) => print_report(&report, &args),
        Err(e) => {
            error!(action = "fail", component = "dashboard", error = %e, "Dashboard run failed");
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
