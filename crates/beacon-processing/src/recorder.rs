use beacon_repository::{
    ActivityStore, Device, DeviceSighting, DeviceStore, Gateway, NewActivity, RepositoryError,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub rssi: i32,
    pub observed_at: DateTime<Utc>,
    pub battery_level: Option<u8>,
}

/// Writes the device's last-seen state and appends one activity.
///
/// The two writes are independent: if the append fails after the update
/// succeeded, the update stays.
pub struct ActivityRecorder<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> ActivityRecorder<'a, S>
where
    S: DeviceStore + ActivityStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        device: &Device,
        gateway: &Gateway,
        observation: Observation,
    ) -> Result<Uuid, RepositoryError> {
        let sighting = DeviceSighting {
            last_seen: observation.observed_at,
            last_rssi: observation.rssi,
            battery_level: observation.battery_level,
            updated_at: Utc::now(),
        };
        self.store.update_last_seen(&device.id, &sighting).await?;

        let activity = NewActivity::observed(gateway, observation.rssi, observation.observed_at);
        self.store.append_activity(&device.id, &activity).await
    }
}
