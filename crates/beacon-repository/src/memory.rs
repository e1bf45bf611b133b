use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{ActivityRecord, Device, DeviceSighting, ErrorLogEntry, Gateway, NewActivity};
use crate::{
    ActivityStore, AllowListStore, DeviceStore, ErrorLogStore, GatewayStore, RepositoryError,
};

#[derive(Default)]
struct MemoryState {
    gateways: Vec<Gateway>,
    devices: HashMap<String, Device>,
    activities: Vec<ActivityRecord>,
    allowed_uuids: Vec<(String, bool)>,
    error_logs: Vec<ErrorLogEntry>,
}

#[derive(Default)]
struct FailureSwitches {
    gateway_lookups: AtomicBool,
    allow_list: AtomicBool,
    device_updates: AtomicBool,
    activity_appends: AtomicBool,
    error_logs: AtomicBool,
}

#[derive(Default)]
struct Counters {
    device_lookups: AtomicUsize,
    writes: AtomicUsize,
}

/// Process-local store with the same matching rules as the Postgres backend.
///
/// Records are stored as given; callers are expected to seed gateways with
/// normalized MACs and devices with lower-case UUIDs.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<RwLock<MemoryState>>,
    failures: Arc<FailureSwitches>,
    counters: Arc<Counters>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_gateway(&self, gateway: Gateway) {
        self.state.write().await.gateways.push(gateway);
    }

    pub async fn insert_device(&self, device: Device) {
        let mut state = self.state.write().await;
        state.devices.insert(device.id.clone(), device);
    }

    pub async fn insert_allowed_uuid(&self, uuid: impl Into<String>, is_active: bool) {
        self.state
            .write()
            .await
            .allowed_uuids
            .push((uuid.into(), is_active));
    }

    pub async fn device(&self, device_id: &str) -> Option<Device> {
        self.state.read().await.devices.get(device_id).cloned()
    }

    pub async fn activities_for(&self, device_id: &str) -> Vec<ActivityRecord> {
        self.state
            .read()
            .await
            .activities
            .iter()
            .filter(|record| record.device_id == device_id)
            .cloned()
            .collect()
    }

    pub async fn activity_count(&self) -> usize {
        self.state.read().await.activities.len()
    }

    pub async fn error_logs(&self) -> Vec<ErrorLogEntry> {
        self.state.read().await.error_logs.clone()
    }

    /// Number of device lookups served so far.
    pub fn device_lookup_count(&self) -> usize {
        self.counters.device_lookups.load(Ordering::SeqCst)
    }

    /// Number of successful device updates and activity appends so far.
    pub fn write_count(&self) -> usize {
        self.counters.writes.load(Ordering::SeqCst)
    }

    pub fn fail_gateway_lookups(&self, fail: bool) {
        self.failures.gateway_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn fail_allow_list(&self, fail: bool) {
        self.failures.allow_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_device_updates(&self, fail: bool) {
        self.failures.device_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_activity_appends(&self, fail: bool) {
        self.failures.activity_appends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_error_logs(&self, fail: bool) {
        self.failures.error_logs.store(fail, Ordering::SeqCst);
    }

    fn check(switch: &AtomicBool, operation: &str) -> Result<(), RepositoryError> {
        if switch.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(format!(
                "{operation} failed (injected)"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl GatewayStore for InMemoryRepository {
    async fn find_active_gateway_by_mac(
        &self,
        normalized_mac: &str,
    ) -> Result<Option<Gateway>, RepositoryError> {
        Self::check(&self.failures.gateway_lookups, "gateway lookup")?;
        let state = self.state.read().await;
        Ok(state
            .gateways
            .iter()
            .find(|gateway| gateway.is_active && gateway.mac_address == normalized_mac)
            .cloned())
    }
}

#[async_trait]
impl DeviceStore for InMemoryRepository {
    async fn find_active_device(
        &self,
        uuid: &str,
        major: u16,
        minor: u16,
    ) -> Result<Option<Device>, RepositoryError> {
        self.counters.device_lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        let mut matches: Vec<&Device> = state
            .devices
            .values()
            .filter(|device| {
                device.is_active
                    && device.uuid == uuid
                    && device.major == major
                    && device.minor == minor
            })
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches.first().map(|device| (*device).clone()))
    }

    async fn update_last_seen(
        &self,
        device_id: &str,
        sighting: &DeviceSighting,
    ) -> Result<(), RepositoryError> {
        Self::check(&self.failures.device_updates, "device update")?;
        let mut state = self.state.write().await;
        let device = state
            .devices
            .get_mut(device_id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "device",
                id: device_id.to_string(),
            })?;

        device.last_seen = Some(sighting.last_seen);
        device.last_rssi = Some(sighting.last_rssi);
        device.updated_at = Some(sighting.updated_at);
        if let Some(level) = sighting.battery_level {
            device.battery_level = Some(level);
        }

        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ActivityStore for InMemoryRepository {
    async fn append_activity(
        &self,
        device_id: &str,
        activity: &NewActivity,
    ) -> Result<Uuid, RepositoryError> {
        Self::check(&self.failures.activity_appends, "activity append")?;
        let id = Uuid::new_v4();
        self.state.write().await.activities.push(ActivityRecord {
            id,
            device_id: device_id.to_string(),
            created_at: Utc::now(),
            activity: activity.clone(),
        });
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }
}

#[async_trait]
impl AllowListStore for InMemoryRepository {
    async fn load_allowed_uuids(&self) -> Result<Vec<String>, RepositoryError> {
        Self::check(&self.failures.allow_list, "allow-list load")?;
        let state = self.state.read().await;
        Ok(state
            .allowed_uuids
            .iter()
            .filter(|(_, is_active)| *is_active)
            .map(|(uuid, _)| uuid.clone())
            .collect())
    }
}

#[async_trait]
impl ErrorLogStore for InMemoryRepository {
    async fn append_error(&self, entry: &ErrorLogEntry) -> Result<(), RepositoryError> {
        Self::check(&self.failures.error_logs, "error log append")?;
        self.state.write().await.error_logs.push(entry.clone());
        Ok(())
    }
}
