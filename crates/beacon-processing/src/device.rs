use beacon_parser::identity::device_uuid_key;
use beacon_parser::DecodedBeacon;
use beacon_repository::{Device, DeviceStore, RepositoryError};

/// Maps a decoded beacon onto its registered, active device. `None` means the
/// beacon is simply not one of ours.
pub struct DeviceResolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> DeviceResolver<'a, S>
where
    S: DeviceStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, beacon: &DecodedBeacon) -> Result<Option<Device>, RepositoryError> {
        self.store
            .find_active_device(&device_uuid_key(&beacon.uuid), beacon.major, beacon.minor)
            .await
    }
}
