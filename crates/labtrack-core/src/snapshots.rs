//! Snapshot manager.
//!
//! Named, point-in-time copies of configuration, each weakly linked to the
//! version active at capture time. Snapshots are write-once read-many: no
//! update, delete, or retention.

use crate::codec;
use crate::error::TrackerError;
use crate::keys;
use crate::model::{ConfigMap, Snapshot};
use chrono::Utc;
use labtrack_store::DocumentStore;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Named configuration snapshots of instruments.
pub struct SnapshotManager<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> SnapshotManager<S> {
    /// Create a snapshot manager over a store handle.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Capture the current configuration under a name.
    ///
    /// The record write is the atomic uniqueness claim (the record key
    /// carries the name), so two racing creators with the same name cannot
    /// both succeed; only the winner appends to the index.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::SnapshotExists`] if the name is taken, or a
    /// store error.
    pub async fn create(
        &self,
        id: &str,
        name: &str,
        description: &str,
        user: &str,
    ) -> Result<Snapshot, TrackerError> {
        let config_key = keys::config(id);
        let data: ConfigMap = match self.store.read(&config_key).await? {
            Some(doc) => codec::decode(&config_key, doc)?,
            None => ConfigMap::new(),
        };
        let version_id = self.latest_version_id(id).await?;

        let snapshot = Snapshot {
            name: name.to_string(),
            timestamp: Utc::now(),
            user: user.to_string(),
            description: description.to_string(),
            version_id,
            data,
        };

        let record_key = keys::snapshot(id, name);
        let claimed = self
            .store
            .put_if_absent(&record_key, codec::encode(&record_key, &snapshot)?)
            .await?;
        if !claimed {
            return Err(TrackerError::SnapshotExists(name.to_string()));
        }

        self.store
            .append_to_array(&keys::snapshot_index(id), json!(name))
            .await?;

        tracing::info!(
            instrument_id = %id,
            snapshot = %name,
            version_id = ?snapshot.version_id,
            "snapshot captured"
        );
        Ok(snapshot)
    }

    /// Snapshot names in creation order; empty if none.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or the index is malformed.
    pub async fn list(&self, id: &str) -> Result<Vec<String>, TrackerError> {
        let key = keys::snapshot_index(id);
        match self.store.read(&key).await? {
            Some(doc) => codec::decode(&key, doc),
            None => Ok(Vec::new()),
        }
    }

    /// Look up one snapshot record.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or the record is malformed.
    pub async fn get(&self, id: &str, name: &str) -> Result<Option<Snapshot>, TrackerError> {
        let key = keys::snapshot(id, name);
        match self.store.read(&key).await? {
            Some(doc) => Ok(Some(codec::decode(&key, doc)?)),
            None => Ok(None),
        }
    }

    /// Last element of the version index at this instant, if any.
    async fn latest_version_id(&self, id: &str) -> Result<Option<Uuid>, TrackerError> {
        let key = keys::version_index(id);
        match self.store.read(&key).await? {
            Some(doc) => {
                let ids: Vec<Uuid> = codec::decode(&key, doc)?;
                Ok(ids.last().copied())
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConfigMap;
    use crate::registry::InstrumentRegistry;
    use crate::versions::VersionManager;
    use labtrack_store::MemoryStore;
    use serde_json::Value;

    fn config(pairs: &[(&str, Value)]) -> ConfigMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    async fn setup() -> (
        VersionManager<MemoryStore>,
        SnapshotManager<MemoryStore>,
    ) {
        let store = Arc::new(MemoryStore::new());
        InstrumentRegistry::new(Arc::clone(&store))
            .create("sensor-1", "Sensor", "temperature", None)
            .await
            .unwrap();
        (
            VersionManager::new(Arc::clone(&store)),
            SnapshotManager::new(store),
        )
    }

    #[tokio::test]
    async fn snapshot_links_last_version_and_freezes_data() {
        let (versions, snapshots) = setup().await;

        let v1 = versions
            .update_config("sensor-1", config(&[("threshold", json!(5))]), "alice", "init")
            .await
            .unwrap()
            .version_id()
            .unwrap();

        let snapshot = snapshots
            .create("sensor-1", "baseline", "initial state", "alice")
            .await
            .unwrap();
        assert_eq!(snapshot.version_id, Some(v1));
        assert_eq!(snapshot.data, config(&[("threshold", json!(5))]));

        // Later updates do not touch the captured data
        versions
            .update_config("sensor-1", config(&[("threshold", json!(9))]), "bob", "bump")
            .await
            .unwrap();
        let kept = snapshots.get("sensor-1", "baseline").await.unwrap().unwrap();
        assert_eq!(kept.data, config(&[("threshold", json!(5))]));
        assert_eq!(kept.version_id, Some(v1));
    }

    #[tokio::test]
    async fn snapshot_before_any_version_has_no_link() {
        let (_, snapshots) = setup().await;

        let snapshot = snapshots
            .create("sensor-1", "empty", "", "alice")
            .await
            .unwrap();
        assert!(snapshot.version_id.is_none());
        assert!(snapshot.data.is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_conflicts_and_keeps_original() {
        let (versions, snapshots) = setup().await;

        versions
            .update_config("sensor-1", config(&[("threshold", json!(5))]), "alice", "init")
            .await
            .unwrap();
        snapshots
            .create("sensor-1", "baseline", "first", "alice")
            .await
            .unwrap();

        versions
            .update_config("sensor-1", config(&[("threshold", json!(9))]), "bob", "bump")
            .await
            .unwrap();
        let err = snapshots
            .create("sensor-1", "baseline", "second", "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::SnapshotExists(name) if name == "baseline"));

        // Loser neither overwrote the record nor double-listed the name
        let kept = snapshots.get("sensor-1", "baseline").await.unwrap().unwrap();
        assert_eq!(kept.description, "first");
        assert_eq!(
            snapshots.list("sensor-1").await.unwrap(),
            vec!["baseline".to_string()]
        );
    }

    #[tokio::test]
    async fn list_and_get_round_trip() {
        let (_, snapshots) = setup().await;

        snapshots.create("sensor-1", "a", "", "alice").await.unwrap();
        snapshots.create("sensor-1", "b", "", "alice").await.unwrap();

        assert_eq!(
            snapshots.list("sensor-1").await.unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(snapshots.get("sensor-1", "missing").await.unwrap().is_none());
    }
}
