//! Wire codec for sensor feed messages.
//!
//! Each message is a UTF-8 JSON object:
//! `{ "groupName": "Greenhouse", "temperature": 21.5, "humidity": 40.0 }`.
//! Extra fields (including any sender `timestamp`) are ignored. Values are
//! accepted as-is; no range checks are applied here.

use serde::Deserialize;
use thiserror::Error;

/// A single reading as received from the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reading {
    #[serde(rename = "groupName")]
    pub group_id: String,
    pub temperature: f64,
    pub humidity: f64,
}

impl Reading {
    pub fn new(group_id: impl Into<String>, temperature: f64, humidity: f64) -> Self {
        Self {
            group_id: group_id.into(),
            temperature,
            humidity,
        }
    }
}

/// Malformed inbound payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed reading: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("reading must be a JSON object")]
    NotAnObject,
}

/// Decode a raw payload into a [`Reading`].
pub fn decode(raw: &[u8]) -> Result<Reading, DecodeError> {
    let value: serde_json::Value = serde_json::from_slice(raw)?;
    // Derived `Deserialize` would also accept a positional array.
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    Ok(Reading::deserialize(value)?)
}

pub fn decode_str(raw: &str) -> Result<Reading, DecodeError> {
    decode(raw.as_bytes())
}
