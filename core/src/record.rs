//! Record normalizer: raw, loosely typed interaction data in,
//! canonical `InteractionRecord` values out.
//!
//! RULE: a bad record never fails the batch. It is reported in
//! `NormalizedBatch::skipped` and the batch moves on.

use crate::{
    error::MalformedRecordError,
    types::{CellId, PhoneNumber, Timestamp},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Characters stripped from phone numbers before comparison.
const NUMBER_SEPARATORS: &[char] = &[' ', '-', '.', '(', ')'];

/// An interaction record exactly as the host application hands it over.
/// Every field is optional and loosely typed; `normalize` decides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, alias = "caller", alias = "origin_number")]
    pub origin: Option<Value>,
    #[serde(default, alias = "callee", alias = "counterpart_number")]
    pub counterpart: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub operator: Option<Value>,
    #[serde(default)]
    pub origin_cell: Option<Value>,
    #[serde(default)]
    pub destination_cell: Option<Value>,
    #[serde(default)]
    pub latitude: Option<Value>,
    #[serde(default)]
    pub longitude: Option<Value>,
    #[serde(default)]
    pub kind: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Call,
    DataSession,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A validated interaction. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    pub origin: PhoneNumber,
    /// Always present for calls; may be absent for data sessions.
    pub counterpart: Option<PhoneNumber>,
    pub timestamp: Timestamp,
    pub duration_secs: u64,
    pub operator: String,
    pub origin_cell: CellId,
    pub destination_cell: CellId,
    pub geo: Option<GeoPoint>,
    pub kind: InteractionKind,
}

/// Output of `normalize_batch`.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub records: Vec<InteractionRecord>,
    pub skipped: Vec<MalformedRecordError>,
}

impl NormalizedBatch {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Normalize every record, skipping the malformed ones.
pub fn normalize_batch(raw: &[RawRecord]) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for (index, record) in raw.iter().enumerate() {
        match normalize(index, record) {
            Ok(r) => batch.records.push(r),
            Err(e) => {
                log::warn!("normalizer: skipping {e}");
                batch.skipped.push(e);
            }
        }
    }
    log::debug!(
        "normalizer: {} records accepted, {} skipped",
        batch.records.len(),
        batch.skipped.len()
    );
    batch
}

/// Normalize a single raw record. `index` is only used for error reporting.
pub fn normalize(index: usize, raw: &RawRecord) -> Result<InteractionRecord, MalformedRecordError> {
    let origin = raw
        .origin
        .as_ref()
        .and_then(value_as_string)
        .and_then(|s| canonical_number(&s))
        .ok_or(MalformedRecordError::MissingOrigin { index })?;

    let timestamp_value = raw
        .timestamp
        .as_ref()
        .filter(|v| !v.is_null())
        .ok_or(MalformedRecordError::MissingTimestamp { index })?;
    let timestamp = parse_timestamp(timestamp_value).ok_or_else(|| {
        MalformedRecordError::InvalidTimestamp {
            index,
            value: value_as_string(timestamp_value).unwrap_or_else(|| timestamp_value.to_string()),
        }
    })?;

    let counterpart = raw
        .counterpart
        .as_ref()
        .and_then(value_as_string)
        .and_then(|s| canonical_number(&s));

    let kind = match raw.kind.as_ref().and_then(value_as_string) {
        Some(tag) => parse_kind(&tag).ok_or(MalformedRecordError::UnknownKind { index, value: tag })?,
        None if counterpart.is_some() => InteractionKind::Call,
        None => InteractionKind::DataSession,
    };

    if kind == InteractionKind::Call {
        match &counterpart {
            None => return Err(MalformedRecordError::MissingCounterpart { index }),
            Some(c) if *c == origin => {
                return Err(MalformedRecordError::SelfInteraction { index, number: origin })
            }
            Some(_) => {}
        }
    }

    let geo = match (
        raw.latitude.as_ref().and_then(value_as_f64),
        raw.longitude.as_ref().and_then(value_as_f64),
    ) {
        (Some(latitude), Some(longitude))
            if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) =>
        {
            Some(GeoPoint { latitude, longitude })
        }
        _ => None,
    };

    Ok(InteractionRecord {
        origin,
        counterpart,
        timestamp,
        duration_secs: raw.duration.as_ref().map(parse_duration).unwrap_or(0),
        operator: trimmed(raw.operator.as_ref()),
        origin_cell: trimmed(raw.origin_cell.as_ref()),
        destination_cell: trimmed(raw.destination_cell.as_ref()),
        geo,
        kind,
    })
}

/// Strip visual separators; keep a leading `+` and everything else.
/// Returns None when nothing is left.
pub fn canonical_number(raw: &str) -> Option<PhoneNumber> {
    let number: String = raw
        .trim()
        .chars()
        .filter(|c| !NUMBER_SEPARATORS.contains(c))
        .collect();
    (!number.is_empty()).then_some(number)
}

fn parse_kind(tag: &str) -> Option<InteractionKind> {
    match tag.trim().to_ascii_lowercase().as_str() {
        "call" | "voice" | "sms" => Some(InteractionKind::Call),
        "data" | "data_session" | "data-session" => Some(InteractionKind::DataSession),
        _ => None,
    }
}

fn parse_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(secs) => DateTime::from_timestamp(secs, 0),
            None => n.as_f64().and_then(from_fractional_secs),
        },
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<Timestamp> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    match s.parse::<i64>() {
        Ok(secs) => DateTime::from_timestamp(secs, 0),
        Err(_) => s.parse::<f64>().ok().and_then(from_fractional_secs),
    }
}

/// Fractional epoch seconds are floored to the whole second.
fn from_fractional_secs(secs: f64) -> Option<Timestamp> {
    if !secs.is_finite() || secs.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(secs.floor() as i64, 0)
}

/// Anything that is not a finite, non-negative number is 0.
fn parse_duration(value: &Value) -> u64 {
    match value_as_f64(value) {
        Some(secs) if secs > 0.0 => secs.floor() as u64,
        _ => 0,
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn trimmed(value: Option<&Value>) -> String {
    value
        .and_then(value_as_string)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
