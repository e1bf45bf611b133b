use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A registered BLE receiver. `mac_address` is stored in normalized form
/// (no delimiters, upper-case).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Gateway {
    pub id: String,
    pub mac_address: String,
    pub name: String,
    #[serde(rename = "type")]
    pub gateway_type: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
}

/// A tracked asset identified by its beacon's (uuid, major, minor).
/// `uuid` is stored lower-case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    pub is_active: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub last_rssi: Option<i32>,
    pub battery_level: Option<u8>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Last-seen fields written when a device is observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSighting {
    pub last_seen: DateTime<Utc>,
    pub last_rssi: i32,
    /// Left untouched in the store when `None`.
    pub battery_level: Option<u8>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub timestamp: DateTime<Utc>,
    pub gateway_id: String,
    pub gateway_name: String,
    pub gateway_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rssi: i32,
    pub triggered_notification: bool,
    pub notification_type: Option<String>,
    pub notification_details: Option<Value>,
}

impl NewActivity {
    /// A fresh observation of a device near `gateway`. The location is the
    /// gateway's; a missing coordinate is recorded as 0.
    pub fn observed(gateway: &Gateway, rssi: i32, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            gateway_id: gateway.id.clone(),
            gateway_name: gateway.name.clone(),
            gateway_type: gateway.gateway_type.clone(),
            latitude: gateway.latitude.unwrap_or(0.0),
            longitude: gateway.longitude.unwrap_or(0.0),
            rssi,
            triggered_notification: false,
            notification_type: None,
            notification_details: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: Uuid,
    pub device_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub activity: NewActivity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub source: String,
    pub message: String,
    pub context: Value,
    pub created_at: DateTime<Utc>,
}

impl ErrorLogEntry {
    pub fn new(source: impl Into<String>, message: impl Into<String>, context: Value) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            context,
            created_at: Utc::now(),
        }
    }
}
