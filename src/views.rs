//! Per-dashboard compositions of the date filter, category filters and
//! aggregators. Each view's filter state is a plain value passed in on every
//! render; nothing is cached between calls.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::cmp::Ordering;

use crate::aggregate::{aggregate, count_by, monthly_totals, Bucket, GroupKey, Reducer, FUNNEL_STAGES};
use crate::filter::{describe_range, filter_in, filter_records, CategoryFilter};
use crate::pipelines::{PipelineTable, WILDCARD};
use crate::range::{resolve, Selector};
use crate::record::Record;

pub const ITEMS_PER_PAGE: usize = 5;

/// Stages counted by the lead-stage panels of the projects dashboard.
pub const LEAD_STAGES: [&str; 3] = ["Conversation", "Follow Up", "Inpipeline"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<R> {
    pub items: Vec<R>,
    /// 1-based.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slices one page out of `items`. `page` is clamped into the valid range.
pub fn paginate<R: Clone>(items: &[R], page: usize, per_page: usize) -> Page<R> {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page);
    let page = page.clamp(1, total_pages.max(1));
    let start = (page - 1) * per_page;

    Page {
        items: items.iter().skip(start).take(per_page).cloned().collect(),
        page,
        total_pages,
        total_items: items.len(),
    }
}

/// Newest first. Undated records sink to the end, keeping their order.
pub fn newest_first<R: Record + Clone>(records: &[R]) -> Vec<R> {
    let mut keyed: Vec<_> = records.iter().map(|r| (r.timestamp(), r)).collect();
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    keyed.into_iter().map(|(_, r)| r.clone()).collect()
}

fn recent<R: Record + Clone>(
    records: &[R],
    selector: &Selector,
    page: usize,
    now: NaiveDateTime,
) -> Page<R> {
    let dated = filter_records(records, &resolve(selector, now));
    paginate(&newest_first(&dated), page, ITEMS_PER_PAGE)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    /// Won share of all records in percent, one decimal place.
    pub conversion_rate: f64,
}

pub fn conversion_rate(converted: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (converted as f64 / total as f64 * 1000.0).round() / 10.0
}

fn summarize<R: Record + Clone>(records: &[R]) -> Summary {
    let won = filter_in(records, "status", &["Won"]).len();
    let lost = filter_in(records, "status", &["Lost"]).len();
    Summary {
        total: records.len(),
        won,
        lost,
        conversion_rate: conversion_rate(won, records.len()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealsView {
    pub range: Selector,
    pub recent_range: Selector,
    pub stages_pipeline: String,
    pub lost_pipeline: String,
    pub won_pipeline: String,
    pub year_pipeline: String,
    pub page: usize,
}

impl Default for DealsView {
    fn default() -> Self {
        Self {
            range: Selector::AllTime,
            recent_range: Selector::AllTime,
            stages_pipeline: WILDCARD.to_string(),
            lost_pipeline: WILDCARD.to_string(),
            won_pipeline: WILDCARD.to_string(),
            year_pipeline: WILDCARD.to_string(),
            page: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealsReport<R> {
    pub range_label: String,
    pub recent: Page<R>,
    pub by_stage: Vec<Bucket>,
    pub lost: Vec<Bucket>,
    pub won: Vec<Bucket>,
    pub by_month: Vec<Bucket>,
    pub summary: Summary,
}

pub fn render_deals<R: Record + Clone>(
    records: &[R],
    view: &DealsView,
    now: NaiveDateTime,
) -> DealsReport<R> {
    let range = resolve(&view.range, now);
    let in_range = filter_records(records, &range);
    let pipeline = CategoryFilter::exact("pipeline");

    let stage_counts_for = |label: &str, status: Option<&str>| {
        let narrowed = pipeline.apply(&in_range, label);
        let narrowed = match status {
            Some(status) => filter_in(&narrowed, "status", &[status]),
            None => narrowed,
        };
        count_by(&narrowed, "stage")
    };

    DealsReport {
        range_label: describe_range(&view.range, &range, records, now),
        recent: recent(records, &view.recent_range, view.page, now),
        by_stage: stage_counts_for(&view.stages_pipeline, None),
        lost: stage_counts_for(&view.lost_pipeline, Some("Lost")),
        won: stage_counts_for(&view.won_pipeline, Some("Won")),
        by_month: monthly_totals(&pipeline.apply(&in_range, &view.year_pipeline), "value"),
        summary: summarize(&in_range),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadsView {
    pub range: Selector,
    pub recent_range: Selector,
    pub stage_range: Selector,
    pub page: usize,
}

impl Default for LeadsView {
    fn default() -> Self {
        Self {
            range: Selector::AllTime,
            recent_range: Selector::AllTime,
            stage_range: Selector::AllTime,
            page: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadsReport<R> {
    pub range_label: String,
    pub recent: Page<R>,
    pub by_stage: Vec<Bucket>,
}

pub fn render_leads<R: Record + Clone>(
    records: &[R],
    view: &LeadsView,
    now: NaiveDateTime,
) -> LeadsReport<R> {
    let range = resolve(&view.range, now);
    let staged = filter_records(records, &resolve(&view.stage_range, now));

    LeadsReport {
        range_label: describe_range(&view.range, &range, records, now),
        recent: recent(records, &view.recent_range, view.page, now),
        by_stage: count_by(&staged, "stage"),
    }
}

/// Date selector and pipeline label of one projects panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelFilter {
    pub range: Selector,
    pub pipeline: String,
}

impl PanelFilter {
    pub fn new(range: Selector, pipeline: &str) -> Self {
        Self {
            range,
            pipeline: pipeline.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectsView {
    pub recent_range: Selector,
    pub source_range: Selector,
    pub stages: PanelFilter,
    pub lead_stages: PanelFilter,
    pub won_stages: PanelFilter,
    pub page: usize,
}

impl Default for ProjectsView {
    fn default() -> Self {
        Self {
            recent_range: Selector::Last30Days,
            source_range: Selector::Last30Days,
            stages: PanelFilter::new(Selector::Last3Months, "Sales"),
            lead_stages: PanelFilter::new(Selector::Last3Months, "Marketing"),
            won_stages: PanelFilter::new(Selector::Last3Months, "Marketing"),
            page: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectsReport<R> {
    pub range_label: String,
    pub recent: Page<R>,
    pub by_source: Vec<Bucket>,
    pub by_stage: Vec<Bucket>,
    pub lead_stages: Vec<Bucket>,
    pub won_stages: Vec<Bucket>,
}

pub fn render_projects<R: Record + Clone>(
    records: &[R],
    view: &ProjectsView,
    pipelines: &PipelineTable,
    now: NaiveDateTime,
) -> ProjectsReport<R> {
    let by_source = CategoryFilter::grouped("source", pipelines);
    let panel = |filter: &PanelFilter| {
        by_source.apply(
            &filter_records(records, &resolve(&filter.range, now)),
            &filter.pipeline,
        )
    };
    let lead_stage_counts =
        |filter: &PanelFilter| count_by(&filter_in(&panel(filter), "stage", &LEAD_STAGES), "stage");

    let recent_range = resolve(&view.recent_range, now);

    ProjectsReport {
        range_label: describe_range(&view.recent_range, &recent_range, records, now),
        recent: recent(records, &view.recent_range, view.page, now),
        by_source: count_by(
            &filter_records(records, &resolve(&view.source_range, now)),
            "source",
        ),
        by_stage: aggregate(
            &panel(&view.stages),
            GroupKey::Field("stage"),
            Reducer::Count,
            Some(&FUNNEL_STAGES[..]),
        ),
        lead_stages: lead_stage_counts(&view.lead_stages),
        won_stages: lead_stage_counts(&view.won_stages),
    }
}
