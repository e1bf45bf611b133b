use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Substituted when a report carries no RSSI.
pub const DEFAULT_RSSI: i32 = -100;

/// The accepted request body shapes, decided once at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportBody {
    /// `[report, ...]`
    Batch(Vec<Value>),
    /// `{ "data": [report, ...] }`
    Wrapped(Vec<Value>),
    /// A single report object.
    Single(Value),
    Unrecognized,
}

impl ReportBody {
    pub fn from_value(body: Value) -> Self {
        match body {
            Value::Array(items) => ReportBody::Batch(items),
            Value::Object(mut map) => {
                match map.remove("data") {
                    Some(Value::Array(items)) => return ReportBody::Wrapped(items),
                    Some(other) => {
                        map.insert("data".to_string(), other);
                    }
                    None => {}
                }

                if map.contains_key("rawData") || map.contains_key("mac") {
                    ReportBody::Single(Value::Object(map))
                } else {
                    ReportBody::Unrecognized
                }
            }
            _ => ReportBody::Unrecognized,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            ReportBody::Batch(_) => "batch",
            ReportBody::Wrapped(_) => "wrapped",
            ReportBody::Single(_) => "single",
            ReportBody::Unrecognized => "unrecognized",
        }
    }

    pub fn into_items(self) -> Vec<Value> {
        match self {
            ReportBody::Batch(items) | ReportBody::Wrapped(items) => items,
            ReportBody::Single(item) => vec![item],
            ReportBody::Unrecognized => Vec::new(),
        }
    }
}

/// One beacon sighting as forwarded by a gateway. Untrusted input.
///
/// Only `rawData` has to be a string. The other fields are kept as raw JSON
/// and interpreted leniently, so an odd `rssi` or `timestamp` never costs
/// the item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReport {
    #[serde(default)]
    pub raw_data: Option<String>,
    #[serde(default)]
    pub rssi: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub mac: Option<Value>,
    #[serde(default)]
    pub ble_name: Option<Value>,
}

impl RawReport {
    pub fn from_value(item: Value) -> Result<Self, String> {
        if !item.is_object() {
            return Err("malformed report: expected a JSON object".to_string());
        }
        serde_json::from_value(item).map_err(|err| format!("malformed report: {err}"))
    }

    /// The hex payload, if present and non-blank.
    pub fn raw_data(&self) -> Option<&str> {
        self.raw_data
            .as_deref()
            .map(str::trim)
            .filter(|data| !data.is_empty())
    }

    /// A JSON number or numeric string, rounded; [`DEFAULT_RSSI`] otherwise.
    pub fn rssi_or_default(&self) -> i32 {
        let rssi = match &self.rssi {
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        rssi.filter(|rssi| rssi.is_finite())
            .map(|rssi| rssi.round() as i32)
            .unwrap_or(DEFAULT_RSSI)
    }

    /// The report's own timestamp, or `now` when absent or unparseable.
    ///
    /// Strings are read as RFC 3339, integers as Unix epoch milliseconds.
    pub fn observed_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let parsed = match &self.timestamp {
            Some(Value::String(text)) => DateTime::parse_from_rfc3339(text.trim())
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
            Some(Value::Number(number)) => {
                number.as_i64().and_then(DateTime::from_timestamp_millis)
            }
            _ => None,
        };
        parsed.unwrap_or(now)
    }
}
