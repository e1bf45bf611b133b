use std::fmt;

use serde::{Deserialize, Serialize};

/// Fields extracted from one iBeacon advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedBeacon {
    /// Canonical 8-4-4-4-12 form, upper-case as it appeared after normalization.
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    pub tx_power: i8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u8>,
}

impl fmt::Display for DecodedBeacon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.uuid, self.major, self.minor)
    }
}
