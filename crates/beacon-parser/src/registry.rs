use crate::errors::DecodeError;
use crate::formats::IBeaconDecoder;
use crate::model::DecodedBeacon;

pub trait FrameDecoder: Send + Sync {
    fn name(&self) -> &'static str;
    fn decode(&self, raw_hex: &str) -> Result<DecodedBeacon, DecodeError>;
}

/// Decodes with the default iBeacon decoder (no battery extraction).
pub fn decode_ibeacon(raw_hex: &str) -> Result<DecodedBeacon, DecodeError> {
    IBeaconDecoder::new().decode(raw_hex)
}
