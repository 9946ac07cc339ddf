//! Tracking facade.
//!
//! [`ConfigTracker`] wires the registry, version manager, and snapshot
//! manager over one shared store handle and exposes the full operation
//! surface. It guards instrument existence on every per-instrument
//! operation and serializes mutating operations per instrument, so two
//! concurrent updates can never diff against the same stale configuration.
//! The managers themselves depend only on the store, never on each other.

use crate::error::TrackerError;
use crate::model::{ConfigMap, Instrument, Snapshot, UpdateOutcome, Version};
use crate::registry::InstrumentRegistry;
use crate::snapshots::SnapshotManager;
use crate::versions::VersionManager;
use labtrack_store::DocumentStore;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::Mutex;
use uuid::Uuid;

/// One named async lock per instrument.
///
/// Locks are created on first use and kept for the process lifetime; the
/// instrument catalog is not expected to grow unboundedly.
#[derive(Default)]
struct LockMap {
    inner: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockMap {
    fn for_instrument(&self, id: &str) -> Arc<Mutex<()>> {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(id.to_string()).or_default())
    }
}

/// The core operation surface: instruments, versioned configuration, and
/// snapshots.
pub struct ConfigTracker<S> {
    registry: InstrumentRegistry<S>,
    versions: VersionManager<S>,
    snapshots: SnapshotManager<S>,
    locks: LockMap,
}

impl<S: DocumentStore> ConfigTracker<S> {
    /// Create a tracker over a store handle.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            registry: InstrumentRegistry::new(Arc::clone(&store)),
            versions: VersionManager::new(Arc::clone(&store)),
            snapshots: SnapshotManager::new(store),
            locks: LockMap::default(),
        }
    }

    /// All registered instruments, keyed by id.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or a record is malformed.
    pub async fn list_instruments(&self) -> Result<BTreeMap<String, Instrument>, TrackerError> {
        self.registry.list().await
    }

    /// One instrument's metadata.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InstrumentNotFound`] for unknown ids.
    pub async fn get_instrument(&self, id: &str) -> Result<Instrument, TrackerError> {
        self.registry
            .get(id)
            .await?
            .ok_or_else(|| TrackerError::InstrumentNotFound(id.to_string()))
    }

    /// Register a new instrument.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InstrumentExists`] if the id is taken.
    pub async fn create_instrument(
        &self,
        id: &str,
        name: &str,
        kind: &str,
        location: Option<String>,
    ) -> Result<Instrument, TrackerError> {
        let lock = self.locks.for_instrument(id);
        let _guard = lock.lock().await;
        self.registry.create(id, name, kind, location).await
    }

    /// Current configuration of an instrument.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InstrumentNotFound`] for unknown ids.
    pub async fn get_config(&self, id: &str) -> Result<ConfigMap, TrackerError> {
        self.require_instrument(id).await?;
        self.versions.get_config(id).await
    }

    /// Apply a configuration update on behalf of `user`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InstrumentNotFound`] for unknown ids, or a
    /// store error.
    pub async fn update_config(
        &self,
        id: &str,
        data: ConfigMap,
        user: &str,
        comment: &str,
    ) -> Result<UpdateOutcome, TrackerError> {
        self.require_instrument(id).await?;
        let lock = self.locks.for_instrument(id);
        let _guard = lock.lock().await;
        self.versions.update_config(id, data, user, comment).await
    }

    /// Version ids of an instrument, in commit order.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InstrumentNotFound`] for unknown ids.
    pub async fn list_versions(&self, id: &str) -> Result<Vec<Uuid>, TrackerError> {
        self.require_instrument(id).await?;
        self.versions.list_versions(id).await
    }

    /// One version record.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InstrumentNotFound`] or
    /// [`TrackerError::VersionNotFound`].
    pub async fn get_version(&self, id: &str, version_id: Uuid) -> Result<Version, TrackerError> {
        self.require_instrument(id).await?;
        self.versions
            .get_version(id, version_id)
            .await?
            .ok_or(TrackerError::VersionNotFound(version_id))
    }

    /// Capture the current configuration under a name, on behalf of `user`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InstrumentNotFound`] or
    /// [`TrackerError::SnapshotExists`].
    pub async fn create_snapshot(
        &self,
        id: &str,
        name: &str,
        description: &str,
        user: &str,
    ) -> Result<Snapshot, TrackerError> {
        self.require_instrument(id).await?;
        let lock = self.locks.for_instrument(id);
        let _guard = lock.lock().await;
        self.snapshots.create(id, name, description, user).await
    }

    /// Snapshot names of an instrument, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InstrumentNotFound`] for unknown ids.
    pub async fn list_snapshots(&self, id: &str) -> Result<Vec<String>, TrackerError> {
        self.require_instrument(id).await?;
        self.snapshots.list(id).await
    }

    /// One snapshot record.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InstrumentNotFound`] or
    /// [`TrackerError::SnapshotNotFound`].
    pub async fn get_snapshot(&self, id: &str, name: &str) -> Result<Snapshot, TrackerError> {
        self.require_instrument(id).await?;
        self.snapshots
            .get(id, name)
            .await?
            .ok_or_else(|| TrackerError::SnapshotNotFound(name.to_string()))
    }

    /// Recompute an instrument's projections from its version log.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InstrumentNotFound`] for unknown ids, or a
    /// store error.
    pub async fn repair(&self, id: &str) -> Result<Option<Uuid>, TrackerError> {
        self.require_instrument(id).await?;
        let lock = self.locks.for_instrument(id);
        let _guard = lock.lock().await;
        self.versions.rebuild(id).await
    }

    async fn require_instrument(&self, id: &str) -> Result<(), TrackerError> {
        if self.registry.get(id).await?.is_none() {
            return Err(TrackerError::InstrumentNotFound(id.to_string()));
        }
        Ok(())
    }
}
