use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

use crate::aggregate::Bucket;
use crate::args::{Args, Dashboard};
use crate::pipelines::{self, PipelineTable};
use crate::range::{Clock, CustomRange, Selector};
use crate::record::{self, parse_timestamp, FlatRecord, Record};
use crate::utils::{format_amount, format_number};
use crate::views::{
    render_deals, render_leads, render_projects, DealsReport, DealsView, LeadsReport, LeadsView,
    Page, ProjectsReport, ProjectsView,
};

#[derive(Debug, Serialize)]
#[serde(tag = "dashboard", rename_all = "lowercase")]
pub enum DashboardReport {
    Deals(DealsReport<FlatRecord>),
    Leads(LeadsReport<FlatRecord>),
    Projects(ProjectsReport<FlatRecord>),
}

/// Picks the selector for one panel: an explicit token wins, a lone
/// `--from`/`--to` implies `Custom`, otherwise the view default stays.
fn selector_for(token: Option<&str>, custom: CustomRange, fallback: Selector) -> Selector {
    match token {
        Some(token) => Selector::parse(token, custom),
        None if custom.start.is_some() || custom.end.is_some() => Selector::Custom(custom),
        None => fallback,
    }
}

pub fn deals_view(args: &Args) -> DealsView {
    let custom = CustomRange::new(args.from, args.to);
    let defaults = DealsView::default();
    let range = selector_for(args.range.as_deref(), custom, defaults.range.clone());
    let recent_range = match args.recent_range.as_deref() {
        Some(token) => Selector::parse(token, custom),
        None => range.clone(),
    };
    let pipeline = args
        .pipeline
        .clone()
        .unwrap_or_else(|| defaults.stages_pipeline.clone());

    DealsView {
        range,
        recent_range,
        stages_pipeline: pipeline.clone(),
        lost_pipeline: pipeline.clone(),
        won_pipeline: pipeline.clone(),
        year_pipeline: pipeline,
        page: args.page,
    }
}

pub fn leads_view(args: &Args) -> LeadsView {
    let custom = CustomRange::new(args.from, args.to);
    let defaults = LeadsView::default();
    let range = selector_for(args.range.as_deref(), custom, defaults.range);
    let recent_range = match args.recent_range.as_deref() {
        Some(token) => Selector::parse(token, custom),
        None => range.clone(),
    };
    let stage_range = match args.stage_range.as_deref() {
        Some(token) => Selector::parse(token, custom),
        None => range.clone(),
    };

    LeadsView {
        stage_range,
        range,
        recent_range,
        page: args.page,
    }
}

pub fn projects_view(args: &Args) -> ProjectsView {
    let custom = CustomRange::new(args.from, args.to);
    let mut view = ProjectsView {
        page: args.page,
        ..ProjectsView::default()
    };

    for panel in [
        &mut view.stages,
        &mut view.lead_stages,
        &mut view.won_stages,
    ] {
        panel.range = match args.stage_range.as_deref() {
            Some(token) => Selector::parse(token, custom),
            None => selector_for(args.range.as_deref(), custom, panel.range.clone()),
        };
        if let Some(pipeline) = &args.pipeline {
            panel.pipeline = pipeline.clone();
        }
    }
    view.source_range = selector_for(args.range.as_deref(), custom, view.source_range.clone());
    view.recent_range = match args.recent_range.as_deref() {
        Some(token) => Selector::parse(token, custom),
        None => selector_for(args.range.as_deref(), custom, view.recent_range.clone()),
    };
    view
}

/// Reference instant: `--now` when given, the clock otherwise.
pub fn reference_now(args: &Args, clock: &impl Clock) -> Result<NaiveDateTime> {
    match &args.now {
        Some(raw) => {
            parse_timestamp(raw).with_context(|| format!("Invalid --now value '{}'", raw))
        }
        None => Ok(clock.now()),
    }
}

pub fn build_report(
    records: &[FlatRecord],
    args: &Args,
    pipelines: &PipelineTable,
    now: NaiveDateTime,
) -> DashboardReport {
    match args.dashboard {
        Dashboard::Deals => DashboardReport::Deals(render_deals(records, &deals_view(args), now)),
        Dashboard::Leads => DashboardReport::Leads(render_leads(records, &leads_view(args), now)),
        Dashboard::Projects => DashboardReport::Projects(render_projects(
            records,
            &projects_view(args),
            pipelines,
            now,
        )),
    }
}

pub fn run_dashboard(args: &Args, clock: &impl Clock) -> Result<DashboardReport> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "dashboard", dashboard = ?args.dashboard, "Starting dashboard run");

    let input = args
        .input
        .as_deref()
        .context("No record file given (use --input)")?;
    let records = record::load_records(input)?;

    let pipelines = if args.no_pipelines {
        PipelineTable::empty()
    } else {
        pipelines::load_pipeline_table(args.pipelines.as_deref())?
    };

    let now = reference_now(args, clock)?;
    info!(action = "resolve", component = "dashboard", now = %now, "Reference time resolved");

    let report = build_report(&records, args, &pipelines, now);

    info!(
        action = "complete",
        component = "dashboard",
        duration_ms = total_start_time.elapsed().as_millis(),
        "Dashboard run completed"
    );
    Ok(report)
}

fn record_title(record: &FlatRecord) -> String {
    ["name", "title", "company", "id"]
        .iter()
        .find_map(|field| record.category(field))
        .unwrap_or_else(|| "(untitled)".to_string())
}

fn print_page(heading: &str, page: &Page<FlatRecord>) {
    println!(
        "\n{} (page {} of {}, {} total):",
        heading,
        page.page,
        page.total_pages.max(1),
        format_number(page.total_items)
    );
    if page.items.is_empty() {
        println!("- none");
    }
    for record in &page.items {
        let date = record
            .timestamp()
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "no date".to_string());
        match record.category("stage") {
            Some(stage) => println!("- {}: {} [{}]", date, record_title(record), stage),
            None => println!("- {}: {}", date, record_title(record)),
        }
    }
}

fn print_buckets(heading: &str, buckets: &[Bucket]) {
    println!("\n{}:", heading);
    if buckets.is_empty() {
        println!("- none");
    }
    for bucket in buckets {
        match (bucket.count(), bucket.total()) {
            (Some(count), _) => println!("- {}: {}", bucket.label, format_number(count)),
            (_, Some(total)) => println!("- {}: {}", bucket.label, format_amount(total)),
            _ => {}
        }
    }
}

pub fn print_report(report: &DashboardReport, args: &Args) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    match report {
        DashboardReport::Deals(deals) => {
            println!("\n--- Deals Dashboard ---");
            println!("Date range: {}", deals.range_label);
            println!(
                "Deals in range: {} (won {}, lost {}, conversion {:.1}%)",
                format_number(deals.summary.total),
                format_number(deals.summary.won),
                format_number(deals.summary.lost),
                deals.summary.conversion_rate
            );
            print_page("Recently created deals", &deals.recent);
            print_buckets("Deals by stage", &deals.by_stage);
            print_buckets("Lost deals by stage", &deals.lost);
            print_buckets("Won deals by stage", &deals.won);
            print_buckets("Deal value by month", &deals.by_month);
        }
        DashboardReport::Leads(leads) => {
            println!("\n--- Leads Dashboard ---");
            println!("Date range: {}", leads.range_label);
            print_page("Recently created leads", &leads.recent);
            print_buckets("Leads by stage", &leads.by_stage);
        }
        DashboardReport::Projects(projects) => {
            println!("\n--- Projects Dashboard ---");
            println!("Date range: {}", projects.range_label);
            print_page("Recently created projects", &projects.recent);
            print_buckets("Projects by source", &projects.by_source);
            print_buckets("Projects by stage", &projects.by_stage);
            print_buckets("Leads by stage", &projects.lead_stages);
            print_buckets("Won deals by stage", &projects.won_stages);
        }
    }
    Ok(())
}
