mod battery;
mod ibeacon;

pub use battery::{BatteryExtractor, NoBattery};
pub use ibeacon::{
    encode_advertisement, IBeaconDecoder, IBEACON_BODY_HEX_LEN, IBEACON_MARKER,
    MIN_FRAME_HEX_LEN,
};
