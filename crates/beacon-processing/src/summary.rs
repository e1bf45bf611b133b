use std::time::Duration;

use beacon_parser::DecodedBeacon;
use beacon_repository::Gateway;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Processed,
    Skipped,
    Filtered,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub index: usize,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<Uuid>,
}

impl ItemResult {
    fn new(index: usize, status: ItemStatus) -> Self {
        Self {
            index,
            status,
            reason: None,
            uuid: None,
            major: None,
            minor: None,
            device_id: None,
            activity_id: None,
        }
    }

    pub fn skipped(index: usize, reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::new(index, ItemStatus::Skipped)
        }
    }

    pub fn filtered(index: usize, beacon: &DecodedBeacon) -> Self {
        Self::new(index, ItemStatus::Filtered)
            .with_beacon(beacon)
            .with_reason("uuid not in allow-list")
    }

    pub fn processed(
        index: usize,
        beacon: &DecodedBeacon,
        device_id: &str,
        activity_id: Uuid,
    ) -> Self {
        Self {
            device_id: Some(device_id.to_string()),
            activity_id: Some(activity_id),
            ..Self::new(index, ItemStatus::Processed).with_beacon(beacon)
        }
    }

    pub fn error(index: usize, message: impl Into<String>) -> Self {
        Self {
            reason: Some(message.into()),
            ..Self::new(index, ItemStatus::Error)
        }
    }

    pub fn with_beacon(mut self, beacon: &DecodedBeacon) -> Self {
        self.uuid = Some(beacon.uuid.clone());
        self.major = Some(beacon.major);
        self.minor = Some(beacon.minor);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_device(mut self, device_id: &str) -> Self {
        self.device_id = Some(device_id.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewaySummary {
    pub mac: String,
    pub name: String,
    #[serde(rename = "type")]
    pub gateway_type: String,
}

impl From<&Gateway> for GatewaySummary {
    fn from(gateway: &Gateway) -> Self {
        Self {
            mac: gateway.mac_address.clone(),
            name: gateway.name.clone(),
            gateway_type: gateway.gateway_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub gateway: GatewaySummary,
    pub received: usize,
    pub processed: usize,
    pub skipped: usize,
    pub filtered_by_uuid: usize,
    pub errors: usize,
    pub results: Vec<ItemResult>,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn from_results(
        gateway: GatewaySummary,
        results: Vec<ItemResult>,
        elapsed: Duration,
    ) -> Self {
        let count = |status: ItemStatus| results.iter().filter(|r| r.status == status).count();
        Self {
            gateway,
            received: results.len(),
            processed: count(ItemStatus::Processed),
            skipped: count(ItemStatus::Skipped),
            filtered_by_uuid: count(ItemStatus::Filtered),
            errors: count(ItemStatus::Error),
            results,
            elapsed,
        }
    }
}
