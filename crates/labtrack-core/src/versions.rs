//! Configuration version manager.
//!
//! Owns an instrument's current configuration and its append-only version
//! history. The version-index append is the commit point: a version is part
//! of history exactly when its id is indexed. The current-configuration
//! document and the instrument's `last_updated` are projections derived
//! from the log, and [`VersionManager::rebuild`] recomputes them after a
//! fault between the commit point and the projection writes.

use crate::codec;
use crate::diff::shallow_diff;
use crate::error::TrackerError;
use crate::keys;
use crate::model::{ConfigMap, Instrument, UpdateOutcome, Version};
use chrono::{DateTime, Utc};
use labtrack_store::DocumentStore;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Versioned configuration state of instruments.
pub struct VersionManager<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> VersionManager<S> {
    /// Create a version manager over a store handle.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Current configuration, or empty if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or the document is malformed.
    pub async fn get_config(&self, id: &str) -> Result<ConfigMap, TrackerError> {
        let key = keys::config(id);
        match self.store.read(&key).await? {
            Some(doc) => codec::decode(&key, doc),
            None => Ok(ConfigMap::new()),
        }
    }

    /// Apply a configuration update.
    ///
    /// The supplied data replaces the configuration wholesale. An empty
    /// shallow diff commits nothing and returns [`UpdateOutcome::NoOp`];
    /// otherwise a version is appended and the projections updated.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or a document is malformed.
    pub async fn update_config(
        &self,
        id: &str,
        new_data: ConfigMap,
        user: &str,
        comment: &str,
    ) -> Result<UpdateOutcome, TrackerError> {
        let old = self.get_config(id).await?;
        let changes = shallow_diff(&old, &new_data);
        if changes.is_empty() {
            tracing::debug!(instrument_id = %id, "update produced no changes");
            return Ok(UpdateOutcome::NoOp);
        }

        let version = Version {
            version_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user: user.to_string(),
            comment: comment.to_string(),
            data: new_data,
            changes,
        };

        // The record is unreachable until indexed.
        let record_key = keys::version(id, version.version_id);
        self.store
            .write(&record_key, codec::encode(&record_key, &version)?)
            .await?;

        // Commit point.
        self.store
            .append_to_array(&keys::version_index(id), json!(version.version_id))
            .await?;

        // Projections derived from the log.
        self.store
            .write(&keys::config(id), Value::Object(version.data.clone()))
            .await?;
        self.touch(id, version.timestamp).await?;

        tracing::info!(
            instrument_id = %id,
            version_id = %version.version_id,
            user = %version.user,
            changed = version.changes.len(),
            "configuration version committed"
        );
        Ok(UpdateOutcome::Committed(version.version_id))
    }

    /// Version ids in commit order; empty if none.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or the index is malformed.
    pub async fn list_versions(&self, id: &str) -> Result<Vec<Uuid>, TrackerError> {
        let key = keys::version_index(id);
        match self.store.read(&key).await? {
            Some(doc) => codec::decode(&key, doc),
            None => Ok(Vec::new()),
        }
    }

    /// Look up one version record.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or the record is malformed.
    pub async fn get_version(
        &self,
        id: &str,
        version_id: Uuid,
    ) -> Result<Option<Version>, TrackerError> {
        let key = keys::version(id, version_id);
        match self.store.read(&key).await? {
            Some(doc) => Ok(Some(codec::decode(&key, doc)?)),
            None => Ok(None),
        }
    }

    /// Recompute the projections from the version log.
    ///
    /// Rewrites the configuration document and `last_updated` from the last
    /// indexed version. Returns that version's id, or `None` when the log
    /// is empty and there is nothing to rebuild from.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Malformed`] if an indexed version has no
    /// record, or a store error.
    pub async fn rebuild(&self, id: &str) -> Result<Option<Uuid>, TrackerError> {
        let ids = self.list_versions(id).await?;
        let Some(&last) = ids.last() else {
            return Ok(None);
        };

        let record_key = keys::version(id, last);
        let Some(version) = self.get_version(id, last).await? else {
            return Err(TrackerError::Malformed {
                key: record_key,
                reason: "indexed version has no record".to_string(),
            });
        };

        self.store
            .write(&keys::config(id), Value::Object(version.data.clone()))
            .await?;
        self.touch(id, version.timestamp).await?;

        tracing::info!(
            instrument_id = %id,
            version_id = %last,
            "projections rebuilt from version log"
        );
        Ok(Some(last))
    }

    /// Stamp `last_updated` on the instrument's metadata record.
    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<(), TrackerError> {
        let key = keys::instrument_meta(id);
        let Some(doc) = self.store.read(&key).await? else {
            tracing::warn!(instrument_id = %id, "no metadata record to stamp last_updated on");
            return Ok(());
        };
        let mut instrument: Instrument = codec::decode(&key, doc)?;
        instrument.last_updated = Some(at);
        self.store
            .write(&key, codec::encode(&key, &instrument)?)
            .await?;
        Ok(())
    }
}
