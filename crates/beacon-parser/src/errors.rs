use thiserror::Error;

/// Reasons a raw hex payload could not be turned into a [`crate::DecodedBeacon`].
///
/// Every variant means "not decodable"; the distinction only exists so the
/// caller can report why an item was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{decoder} frame too short: {length} hex characters, need at least {minimum}")]
    TooShort {
        decoder: &'static str,
        length: usize,
        minimum: usize,
    },

    #[error("{decoder} marker {marker} not found")]
    MarkerNotFound {
        decoder: &'static str,
        marker: &'static str,
    },

    #[error("{decoder} frame truncated after marker: {available} hex characters, need {required}")]
    Truncated {
        decoder: &'static str,
        available: usize,
        required: usize,
    },

    #[error("{decoder} invalid hex in {field}: '{value}'")]
    InvalidHex {
        decoder: &'static str,
        field: &'static str,
        value: String,
    },
}

impl DecodeError {
    pub fn decoder(&self) -> &'static str {
        match self {
            DecodeError::TooShort { decoder, .. }
            | DecodeError::MarkerNotFound { decoder, .. }
            | DecodeError::Truncated { decoder, .. }
            | DecodeError::InvalidHex { decoder, .. } => *decoder,
        }
    }
}
