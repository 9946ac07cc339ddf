//! Persisted key layout.
//!
//! One record per instrument plus append-only indices. Metadata lives in a
//! per-instrument record rather than a single shared catalog document, so
//! concurrent instrument creation and `last_updated` stamping never contend
//! on one hot key.

use uuid::Uuid;

/// Append-only array of registered instrument ids.
pub const CATALOG_INDEX: &str = "instruments:index";

/// Metadata record of one instrument.
#[must_use]
pub fn instrument_meta(id: &str) -> String {
    format!("instrument:{id}:meta")
}

/// Current configuration (projection of the version log).
#[must_use]
pub fn config(id: &str) -> String {
    format!("instrument:{id}:config")
}

/// Append-only array of version ids, in commit order.
#[must_use]
pub fn version_index(id: &str) -> String {
    format!("instrument:{id}:versions")
}

/// Immutable version record.
#[must_use]
pub fn version(id: &str, version_id: Uuid) -> String {
    format!("instrument:{id}:version:{version_id}")
}

/// Append-only array of snapshot names, in creation order.
#[must_use]
pub fn snapshot_index(id: &str) -> String {
    format!("instrument:{id}:snapshots")
}

/// Immutable snapshot record.
#[must_use]
pub fn snapshot(id: &str, name: &str) -> String {
    format!("instrument:{id}:snapshot:{name}")
}
