//! Canonical forms for identifiers coming off the wire.
//!
//! Gateways are matched by MAC, the allow-list by upper-case UUID and
//! devices by lower-case UUID. The two UUID forms are deliberately
//! different, so each has its own function.

/// `aa:bb:cc:dd:ee:01` -> `AABBCCDDEE01`.
pub fn normalize_mac(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|ch| *ch != ':')
        .map(|ch| ch.to_ascii_uppercase())
        .collect()
}

/// Key used for allow-list membership: upper-case, dashes kept.
pub fn allow_list_uuid_key(uuid: &str) -> String {
    uuid.trim().to_ascii_uppercase()
}

/// Key used for device lookups: lower-case, dashes kept.
pub fn device_uuid_key(uuid: &str) -> String {
    uuid.trim().to_ascii_lowercase()
}
