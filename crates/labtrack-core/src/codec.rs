//! JSON encoding helpers for stored documents.

use crate::error::TrackerError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub(crate) fn encode<T: Serialize>(key: &str, value: &T) -> Result<Value, TrackerError> {
    serde_json::to_value(value).map_err(|e| TrackerError::Malformed {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, TrackerError> {
    serde_json::from_value(value).map_err(|e| TrackerError::Malformed {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
