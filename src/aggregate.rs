use serde::Serialize;
use std::collections::HashMap;
use tracing::trace;

use crate::record::Record;

/// Short month names in calendar order, as produced by [`GroupKey::Month`].
pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Funnel order used for stage breakdowns.
pub const FUNNEL_STAGES: [&str; 6] = [
    "Inpipeline",
    "Follow Up",
    "Schedule Service",
    "Conversation",
    "Won",
    "Lost",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey<'a> {
    /// Value of a categorical field.
    Field(&'a str),
    /// Short month name of the record's date.
    Month,
}

impl GroupKey<'_> {
    fn label_for<R: Record>(&self, record: &R) -> Option<String> {
        match self {
            GroupKey::Field(field) => record.category(field),
            GroupKey::Month => record
                .timestamp()
                .map(|ts| ts.format("%b").to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer<'a> {
    Count,
    /// Sum of a numeric field; absent or non-numeric values add nothing.
    Sum(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    Count(usize),
    Total(f64),
}

impl Measure {
    fn zero(reducer: Reducer<'_>) -> Self {
        match reducer {
            Reducer::Count => Measure::Count(0),
            Reducer::Sum(_) => Measure::Total(0.0),
        }
    }

    fn absorb<R: Record>(&mut self, reducer: Reducer<'_>, record: &R) {
        match (self, reducer) {
            (Measure::Count(n), _) => *n += 1,
            (Measure::Total(total), Reducer::Sum(field)) => {
                *total += record.amount(field).unwrap_or(0.0)
            }
            (Measure::Total(_), Reducer::Count) => {}
        }
    }
}

/// One labelled row of chart data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub label: String,
    #[serde(flatten)]
    pub measure: Measure,
}

impl Bucket {
    pub fn count(&self) -> Option<usize> {
        match self.measure {
            Measure::Count(n) => Some(n),
            Measure::Total(_) => None,
        }
    }

    pub fn total(&self) -> Option<f64> {
        match self.measure {
            Measure::Total(t) => Some(t),
            Measure::Count(_) => None,
        }
    }
}

/// Groups `records` by `key` and reduces each group.
///
/// Without `order`, buckets appear in first-seen order. With `order`, exactly
/// one bucket per listed label is emitted (zero when unseen) and labels not in
/// the list are dropped. Records with no label for `key` are skipped.
pub fn aggregate<R: Record>(
    records: &[R],
    key: GroupKey<'_>,
    reducer: Reducer<'_>,
    order: Option<&[&str]>,
) -> Vec<Bucket> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<Bucket> = Vec::new();

    for label in order.unwrap_or_default() {
        if index.contains_key(*label) {
            continue;
        }
        index.insert(label.to_string(), buckets.len());
        buckets.push(Bucket {
            label: label.to_string(),
            measure: Measure::zero(reducer),
        });
    }

    let mut skipped = 0usize;
    for record in records {
        let Some(label) = key.label_for(record) else {
            skipped += 1;
            continue;
        };

        let slot = match index.get(&label) {
            Some(&slot) => slot,
            None if order.is_some() => {
                skipped += 1;
                continue;
            }
            None => {
                index.insert(label.clone(), buckets.len());
                buckets.push(Bucket {
                    label,
                    measure: Measure::zero(reducer),
                });
                buckets.len() - 1
            }
        };
        buckets[slot].measure.absorb(reducer, record);
    }

    trace!(
        action = "aggregate",
        component = "bucket_builder",
        record_count = records.len(),
        bucket_count = buckets.len(),
        skipped_count = skipped,
        "Built buckets"
    );
    buckets
}

/// Count of records per distinct `field` value, first-seen order.
pub fn count_by<R: Record>(records: &[R], field: &str) -> Vec<Bucket> {
    aggregate(records, GroupKey::Field(field), Reducer::Count, None)
}

/// Sum of `field` for each calendar month, January to December.
pub fn monthly_totals<R: Record>(records: &[R], field: &str) -> Vec<Bucket> {
    aggregate(records, GroupKey::Month, Reducer::Sum(field), Some(&MONTHS[..]))
}
