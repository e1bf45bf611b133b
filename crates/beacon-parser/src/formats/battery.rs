/// Vendor-specific battery level extraction.
///
/// Receives the upper-cased hex payload. Implementations return `None`
/// when the payload does not carry a battery reading in their framing.
pub trait BatteryExtractor: Send + Sync {
    fn battery_level(&self, normalized_hex: &str) -> Option<u8>;
}

/// Default extractor: the payload framing for battery data is unspecified,
/// so no level is ever reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBattery;

impl BatteryExtractor for NoBattery {
    fn battery_level(&self, _normalized_hex: &str) -> Option<u8> {
        None
    }
}
