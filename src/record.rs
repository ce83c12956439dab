use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Name of the field every record is dated by.
pub const DATE_FIELD: &str = "date";

/// A row that can be filtered by date, grouped by a label and summed.
pub trait Record {
    /// Raw date text, if the record carries one.
    fn date_value(&self) -> Option<&str>;

    /// Categorical value of `field` rendered as a label.
    fn category(&self, field: &str) -> Option<String>;

    /// Numeric value of `field`. Numeric strings count.
    fn amount(&self, field: &str) -> Option<f64>;

    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.date_value().and_then(parse_timestamp)
    }
}

/// A flat JSON object, as returned by the CRM endpoints or the bundled
/// sample datasets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRecord {
    fields: Map<String, Value>,
}

impl FlatRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl TryFrom<Value> for FlatRecord {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

impl Record for FlatRecord {
    fn date_value(&self) -> Option<&str> {
        self.fields.get(DATE_FIELD).and_then(Value::as_str)
    }

    fn category(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn amount(&self, field: &str) -> Option<f64> {
        match self.fields.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

/// Parses record date text into local wall-clock time.
///
/// Accepts bare calendar dates (local midnight), naive date-times with `T` or
/// a space separator and optional fractional seconds, and RFC 3339 instants,
/// which are shifted into the local zone.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Local).naive_local());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Loads a JSON array of flat objects.
pub fn load_records(path: &Path) -> Result<Vec<FlatRecord>> {
    let start_time = Instant::now();
    info!(action = "start", component = "record_loading", file_path = ?path, "Loading records");

    if !path.exists() {
        anyhow::bail!("Record file not found: {:?}", path);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read record file {:?}", path))?;
    let records: Vec<FlatRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Expected a JSON array of objects in {:?}", path))?;

    let undated = records.iter().filter(|r| r.timestamp().is_none()).count();
    info!(
        action = "complete",
        component = "record_loading",
        record_count = records.len(),
        undated_count = undated,
        duration_ms = start_time.elapsed().as_millis(),
        "Loaded records"
    );

    Ok(records)
}
