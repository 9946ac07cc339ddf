//! Data model: instruments, configuration versions, and snapshots.

use crate::diff::ChangeSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current key-value configuration of one instrument.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// A registered instrument and its static metadata.
///
/// `id` is unique and immutable. `last_updated` is the only field mutated
/// after creation, and only as a side effect of a committed configuration
/// update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Unique instrument identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Instrument type (e.g. "temperature")
    #[serde(rename = "type")]
    pub kind: String,
    /// Physical location, if known
    pub location: Option<String>,
    /// Timestamp of the last committed configuration update
    pub last_updated: Option<DateTime<Utc>>,
}

impl Instrument {
    /// Create metadata for a newly registered instrument.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        location: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            location,
            last_updated: None,
        }
    }
}

/// One accepted configuration change.
///
/// Immutable once created. `data` is the complete configuration after the
/// change, so any version is self-sufficient for recovery and snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Globally unique version identifier
    pub version_id: Uuid,
    /// Acceptance time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Identity supplied by the caller
    pub user: String,
    /// Free-form change comment
    pub comment: String,
    /// Full configuration after this change
    pub data: ConfigMap,
    /// Shallow diff against the prior configuration
    pub changes: ChangeSet,
}

/// A named, immutable capture of an instrument's configuration.
///
/// `version_id` is a weak reference: it names the version last appended at
/// capture time, is never validated against the version store, and is not
/// updated when later versions are created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot name, unique per instrument
    pub name: String,
    /// Capture time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Identity supplied by the caller
    pub user: String,
    /// Free-form description
    pub description: String,
    /// Version active at capture time, if any
    pub version_id: Option<Uuid>,
    /// Full configuration copy at capture time
    pub data: ConfigMap,
}

/// Result of a configuration update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A new version was appended.
    Committed(Uuid),
    /// The update was accepted but produced no changes; nothing was written.
    NoOp,
}

impl UpdateOutcome {
    /// The committed version id, if any.
    #[must_use]
    pub fn version_id(self) -> Option<Uuid> {
        match self {
            Self::Committed(id) => Some(id),
            Self::NoOp => None,
        }
    }

    /// Whether the update produced no new version.
    #[must_use]
    pub fn is_noop(self) -> bool {
        matches!(self, Self::NoOp)
    }
}
