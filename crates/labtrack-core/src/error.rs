//! Error taxonomy for the tracking core.
//!
//! Not-found and conflict errors are surfaced directly to the caller and
//! never retried; store failures propagate via [`StoreError`], where the
//! retry decorator (if installed) has already had its say.

use labtrack_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Errors from registry, versioning, and snapshot operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The referenced instrument does not exist.
    #[error("instrument not found: {0}")]
    InstrumentNotFound(String),

    /// The referenced version does not exist.
    #[error("version not found: {0}")]
    VersionNotFound(Uuid),

    /// The referenced snapshot does not exist.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// An instrument with this id is already registered.
    #[error("instrument already exists: {0}")]
    InstrumentExists(String),

    /// A snapshot with this name already exists for the instrument.
    #[error("snapshot already exists: {0}")]
    SnapshotExists(String),

    /// A stored document does not have the shape the core expects.
    #[error("malformed document at {key}: {reason}")]
    Malformed {
        /// Key of the offending document
        key: String,
        /// What went wrong decoding it
        reason: String,
    },

    /// The document store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
