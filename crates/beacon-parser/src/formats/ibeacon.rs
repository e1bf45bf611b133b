use std::ops::Range;

use crate::errors::DecodeError;
use crate::formats::battery::{BatteryExtractor, NoBattery};
use crate::model::DecodedBeacon;
use crate::registry::FrameDecoder;

const DECODER_NAME: &str = "ibeacon";

/// Apple company id (little-endian `4C00`), iBeacon type `02`, length `15`.
pub const IBEACON_MARKER: &str = "4C000215";

/// Shortest raw payload that can hold a complete iBeacon structure.
pub const MIN_FRAME_HEX_LEN: usize = 50;

/// UUID (16 bytes) + major (2) + minor (2) + TX power (1), as hex characters.
pub const IBEACON_BODY_HEX_LEN: usize = 42;

const UUID_RANGE: Range<usize> = 0..32;
const MAJOR_RANGE: Range<usize> = 32..36;
const MINOR_RANGE: Range<usize> = 36..40;
const TX_POWER_RANGE: Range<usize> = 40..42;

/// Flags AD structure followed by the manufacturer-specific data header.
const ADVERTISEMENT_PREFIX: &str = "0201061AFF";

#[derive(Debug, Clone, Default)]
pub struct IBeaconDecoder<B = NoBattery> {
    battery: B,
}

impl IBeaconDecoder<NoBattery> {
    pub const fn new() -> Self {
        Self { battery: NoBattery }
    }
}

impl<B: BatteryExtractor> IBeaconDecoder<B> {
    pub fn with_battery(battery: B) -> Self {
        Self { battery }
    }
}

impl<B: BatteryExtractor> FrameDecoder for IBeaconDecoder<B> {
    fn name(&self) -> &'static str {
        DECODER_NAME
    }

    fn decode(&self, raw_hex: &str) -> Result<DecodedBeacon, DecodeError> {
        let length = raw_hex.chars().count();
        if length < MIN_FRAME_HEX_LEN {
            return Err(DecodeError::TooShort {
                decoder: DECODER_NAME,
                length,
                minimum: MIN_FRAME_HEX_LEN,
            });
        }

        let normalized = raw_hex.to_ascii_uppercase();
        let marker_at = normalized
            .find(IBEACON_MARKER)
            .ok_or(DecodeError::MarkerNotFound {
                decoder: DECODER_NAME,
                marker: IBEACON_MARKER,
            })?;

        let body = &normalized[marker_at + IBEACON_MARKER.len()..];
        if body.len() < IBEACON_BODY_HEX_LEN {
            return Err(DecodeError::Truncated {
                decoder: DECODER_NAME,
                available: body.len(),
                required: IBEACON_BODY_HEX_LEN,
            });
        }

        let uuid = hyphenate_uuid(hex_field(body, UUID_RANGE, "uuid")?);
        let major = parse_u16(body, MAJOR_RANGE, "major")?;
        let minor = parse_u16(body, MINOR_RANGE, "minor")?;
        let tx_raw = parse_u8(body, TX_POWER_RANGE, "tx_power")?;

        Ok(DecodedBeacon {
            uuid,
            major,
            minor,
            // two's complement: raw values above 127 are negative dBm
            tx_power: tx_raw as i8,
            battery_level: self.battery.battery_level(&normalized),
        })
    }
}

/// Builds a full advertising payload (flags, manufacturer header, iBeacon
/// body) for the given beacon fields. The battery level is not encoded.
pub fn encode_advertisement(beacon: &DecodedBeacon) -> String {
    let uuid: String = beacon
        .uuid
        .chars()
        .filter(|ch| *ch != '-')
        .map(|ch| ch.to_ascii_uppercase())
        .collect();

    format!(
        "{ADVERTISEMENT_PREFIX}{IBEACON_MARKER}{uuid}{:04X}{:04X}{:02X}",
        beacon.major, beacon.minor, beacon.tx_power as u8
    )
}

fn hex_field<'a>(
    body: &'a str,
    range: Range<usize>,
    field: &'static str,
) -> Result<&'a str, DecodeError> {
    match body.get(range) {
        Some(slice) if slice.bytes().all(|b| b.is_ascii_hexdigit()) => Ok(slice),
        other => Err(DecodeError::InvalidHex {
            decoder: DECODER_NAME,
            field,
            value: other.unwrap_or_default().to_string(),
        }),
    }
}

fn parse_u16(body: &str, range: Range<usize>, field: &'static str) -> Result<u16, DecodeError> {
    let digits = hex_field(body, range, field)?;
    u16::from_str_radix(digits, 16).map_err(|_| DecodeError::InvalidHex {
        decoder: DECODER_NAME,
        field,
        value: digits.to_string(),
    })
}

fn parse_u8(body: &str, range: Range<usize>, field: &'static str) -> Result<u8, DecodeError> {
    let digits = hex_field(body, range, field)?;
    u8::from_str_radix(digits, 16).map_err(|_| DecodeError::InvalidHex {
        decoder: DECODER_NAME,
        field,
        value: digits.to_string(),
    })
}

fn hyphenate_uuid(hex: &str) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
