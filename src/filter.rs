//! Date-window and categorical narrowing of record sets.
//!
//! Every function here borrows its input and returns a new, order-preserving
//! selection. Records with a missing or unparseable date survive only a
//! pass-through range.

use chrono::NaiveDateTime;
use tracing::trace;

use crate::pipelines::{PipelineTable, WILDCARD};
use crate::range::{ResolvedRange, Selector};
use crate::record::Record;

/// Records inside `range`, in their original order.
pub fn matching<'a, R: Record>(
    records: &'a [R],
    range: &'a ResolvedRange,
) -> impl Iterator<Item = &'a R> + 'a {
    records.iter().filter(move |record| range.contains(record.timestamp()))
}

pub fn filter_records<R: Record + Clone>(records: &[R], range: &ResolvedRange) -> Vec<R> {
    let kept: Vec<R> = matching(records, range).cloned().collect();
    trace!(
        action = "filter",
        component = "date_filter",
        input_count = records.len(),
        kept_count = kept.len(),
        "Applied date range"
    );
    kept
}

/// Earliest and latest parseable timestamps. Undated records are ignored.
pub fn data_span<R: Record>(records: &[R]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    records
        .iter()
        .filter_map(|record| record.timestamp())
        .fold(None, |span, ts| match span {
            None => Some((ts, ts)),
            Some((lo, hi)) => Some((lo.min(ts), hi.max(ts))),
        })
}

fn short_date(ts: NaiveDateTime) -> String {
    ts.format("%-d %b %y").to_string()
}

/// Human-readable label for what a selector currently shows, e.g.
/// `10 Jun 24 - 15 Jun 24`. Pass-through ranges describe the span of the data
/// itself, falling back to `now` when nothing is dated.
pub fn describe_range<R: Record>(
    selector: &Selector,
    range: &ResolvedRange,
    records: &[R],
    now: NaiveDateTime,
) -> String {
    match (selector, range) {
        (Selector::Today, _) => short_date(now),
        (Selector::Custom(_), ResolvedRange::PassThrough) => {
            "Select Custom Range".to_string()
        }
        (_, ResolvedRange::Bounded { start, end }) => {
            format!("{} - {}", short_date(*start), short_date(*end))
        }
        (_, ResolvedRange::PassThrough) => {
            let (start, end) = data_span(records).unwrap_or((now, now));
            format!("{} - {}", short_date(start), short_date(end))
        }
    }
}

/// Narrows records by one categorical field.
///
/// A label present in the pipeline table matches any of its mapped values;
/// other labels must equal the field value exactly. [`WILDCARD`] keeps
/// everything.
#[derive(Debug, Clone, Copy)]
pub struct CategoryFilter<'a> {
    field: &'a str,
    table: Option<&'a PipelineTable>,
}

impl<'a> CategoryFilter<'a> {
    pub fn exact(field: &'a str) -> Self {
        Self { field, table: None }
    }

    pub fn grouped(field: &'a str, table: &'a PipelineTable) -> Self {
        Self {
            field,
            table: Some(table),
        }
    }

    pub fn accepts<R: Record>(&self, record: &R, label: &str) -> bool {
        if label == WILDCARD {
            return true;
        }
        let Some(value) = record.category(self.field) else {
            return false;
        };
        match self.table.and_then(|table| table.get(label)) {
            Some(values) => values.iter().any(|v| *v == value),
            None => value == label,
        }
    }

    pub fn apply<R: Record + Clone>(&self, records: &[R], label: &str) -> Vec<R> {
        records
            .iter()
            .filter(|record| self.accepts(*record, label))
            .cloned()
            .collect()
    }
}

/// Records whose `field` is one of `values`.
pub fn filter_in<R: Record + Clone>(records: &[R], field: &str, values: &[&str]) -> Vec<R> {
    records
        .iter()
        .filter(|record| {
            record
                .category(field)
                .is_some_and(|value| values.contains(&value.as_str()))
        })
        .cloned()
        .collect()
}
