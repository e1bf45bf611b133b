//! Decoding of BLE advertising payloads forwarded by gateways, plus the
//! identity canonicalization rules used to match them against registered
//! gateways, devices and the service UUID allow-list.

pub mod errors;
pub mod formats;
pub mod identity;
pub mod model;
mod registry;

pub use errors::DecodeError;
pub use formats::{encode_advertisement, BatteryExtractor, IBeaconDecoder, NoBattery};
pub use model::DecodedBeacon;
pub use registry::{decode_ibeacon, FrameDecoder};
