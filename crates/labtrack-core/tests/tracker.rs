//! End-to-end tests of the tracking facade over the in-memory store.

use labtrack_core::{ConfigMap, ConfigTracker, FieldChange, TrackerError, UpdateOutcome};
use labtrack_store::{DocumentStore, MemoryStore};
use serde_json::{json, Value};
use std::sync::Arc;

fn config(pairs: &[(&str, Value)]) -> ConfigMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn tracker() -> (Arc<MemoryStore>, ConfigTracker<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Arc::clone(&store), ConfigTracker::new(store))
}

#[tokio::test]
async fn sensor_scenario() {
    let (_, tracker) = tracker();

    tracker
        .create_instrument("sensor-1", "Sensor", "temperature", None)
        .await
        .unwrap();

    // First update commits a version with an "added" change
    let v1 = tracker
        .update_config("sensor-1", config(&[("threshold", json!(5))]), "alice", "init")
        .await
        .unwrap()
        .version_id()
        .unwrap();

    let version = tracker.get_version("sensor-1", v1).await.unwrap();
    assert_eq!(version.changes.len(), 1);
    assert_eq!(version.changes["threshold"], FieldChange::Added { new: json!(5) });

    // Repeating the identical call is a no-op and appends nothing
    let repeat = tracker
        .update_config("sensor-1", config(&[("threshold", json!(5))]), "alice", "init")
        .await
        .unwrap();
    assert_eq!(repeat, UpdateOutcome::NoOp);
    assert_eq!(tracker.list_versions("sensor-1").await.unwrap(), vec![v1]);

    // Snapshot links the last version and copies the data
    let snapshot = tracker
        .create_snapshot("sensor-1", "baseline", "initial state", "alice")
        .await
        .unwrap();
    assert_eq!(snapshot.version_id, Some(v1));
    assert_eq!(snapshot.data, config(&[("threshold", json!(5))]));

    // A later update leaves the snapshot untouched
    let v2 = tracker
        .update_config("sensor-1", config(&[("threshold", json!(9))]), "bob", "bump")
        .await
        .unwrap()
        .version_id()
        .unwrap();
    assert_eq!(tracker.list_versions("sensor-1").await.unwrap(), vec![v1, v2]);

    let kept = tracker.get_snapshot("sensor-1", "baseline").await.unwrap();
    assert_eq!(kept.data, config(&[("threshold", json!(5))]));
    assert_eq!(
        tracker.get_config("sensor-1").await.unwrap(),
        config(&[("threshold", json!(9))])
    );

    // last_updated tracks the latest committed version
    let instrument = tracker.get_instrument("sensor-1").await.unwrap();
    let v2_record = tracker.get_version("sensor-1", v2).await.unwrap();
    assert_eq!(instrument.last_updated, Some(v2_record.timestamp));
}

#[tokio::test]
async fn operations_on_unknown_instruments_fail() {
    let (_, tracker) = tracker();

    assert!(matches!(
        tracker.get_instrument("ghost").await.unwrap_err(),
        TrackerError::InstrumentNotFound(_)
    ));
    assert!(matches!(
        tracker.get_config("ghost").await.unwrap_err(),
        TrackerError::InstrumentNotFound(_)
    ));
    assert!(matches!(
        tracker
            .update_config("ghost", ConfigMap::new(), "alice", "")
            .await
            .unwrap_err(),
        TrackerError::InstrumentNotFound(_)
    ));
    assert!(matches!(
        tracker.list_versions("ghost").await.unwrap_err(),
        TrackerError::InstrumentNotFound(_)
    ));
    assert!(matches!(
        tracker.create_snapshot("ghost", "s", "", "alice").await.unwrap_err(),
        TrackerError::InstrumentNotFound(_)
    ));
    assert!(matches!(
        tracker.list_snapshots("ghost").await.unwrap_err(),
        TrackerError::InstrumentNotFound(_)
    ));
    assert!(matches!(
        tracker.repair("ghost").await.unwrap_err(),
        TrackerError::InstrumentNotFound(_)
    ));
}

#[tokio::test]
async fn missing_version_and_snapshot_lookups_fail() {
    let (_, tracker) = tracker();
    tracker
        .create_instrument("sensor-1", "Sensor", "temperature", None)
        .await
        .unwrap();

    assert!(matches!(
        tracker
            .get_version("sensor-1", uuid::Uuid::new_v4())
            .await
            .unwrap_err(),
        TrackerError::VersionNotFound(_)
    ));
    assert!(matches!(
        tracker.get_snapshot("sensor-1", "missing").await.unwrap_err(),
        TrackerError::SnapshotNotFound(_)
    ));
}

#[tokio::test]
async fn duplicate_instrument_and_snapshot_conflict() {
    let (_, tracker) = tracker();
    tracker
        .create_instrument("sensor-1", "Sensor", "temperature", None)
        .await
        .unwrap();
    assert!(matches!(
        tracker
            .create_instrument("sensor-1", "Other", "pressure", None)
            .await
            .unwrap_err(),
        TrackerError::InstrumentExists(_)
    ));

    tracker
        .create_snapshot("sensor-1", "baseline", "", "alice")
        .await
        .unwrap();
    assert!(matches!(
        tracker
            .create_snapshot("sensor-1", "baseline", "", "bob")
            .await
            .unwrap_err(),
        TrackerError::SnapshotExists(_)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_serialize_per_instrument() {
    let (_, tracker) = tracker();
    let tracker = Arc::new(tracker);
    tracker
        .create_instrument("sensor-1", "Sensor", "temperature", None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8_i64 {
        let tracker = Arc::clone(&tracker);
        handles.push(tokio::spawn(async move {
            tracker
                .update_config(
                    "sensor-1",
                    config(&[("threshold", json!(i))]),
                    "alice",
                    "concurrent",
                )
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        let outcome = handle.await.unwrap();
        // Every value is distinct from the state it was diffed against
        assert!(!outcome.is_noop());
    }

    // The log explains every step and the projection matches its tail
    let version_ids = tracker.list_versions("sensor-1").await.unwrap();
    assert_eq!(version_ids.len(), 8);

    let mut state = ConfigMap::new();
    for vid in &version_ids {
        let version = tracker.get_version("sensor-1", *vid).await.unwrap();
        assert!(!version.changes.is_empty());
        // Each version diffed against the configuration left by its predecessor
        assert_eq!(labtrack_core::shallow_diff(&state, &version.data), version.changes);
        state = version.data;
    }
    assert_eq!(tracker.get_config("sensor-1").await.unwrap(), state);
}

#[tokio::test]
async fn repair_rebuilds_projections_after_partial_failure() {
    let (store, tracker) = tracker();
    tracker
        .create_instrument("sensor-1", "Sensor", "temperature", None)
        .await
        .unwrap();
    tracker
        .update_config("sensor-1", config(&[("threshold", json!(5))]), "alice", "init")
        .await
        .unwrap();

    // Simulate a crash between the commit point and the projection writes:
    // append a fully formed version to the log without touching projections.
    let vid = uuid::Uuid::new_v4();
    let record = json!({
        "version_id": vid,
        "timestamp": "2026-01-05T10:00:00Z",
        "user": "bob",
        "comment": "interrupted",
        "data": {"threshold": 9},
        "changes": {"threshold": {"op": "updated", "old": 5, "new": 9}},
    });
    store
        .write(&format!("instrument:sensor-1:version:{vid}"), record)
        .await
        .unwrap();
    store
        .append_to_array("instrument:sensor-1:versions", json!(vid))
        .await
        .unwrap();

    assert_eq!(
        tracker.get_config("sensor-1").await.unwrap(),
        config(&[("threshold", json!(5))])
    );

    let repaired = tracker.repair("sensor-1").await.unwrap();
    assert_eq!(repaired, Some(vid));
    assert_eq!(
        tracker.get_config("sensor-1").await.unwrap(),
        config(&[("threshold", json!(9))])
    );
    let instrument = tracker.get_instrument("sensor-1").await.unwrap();
    assert_eq!(
        instrument.last_updated.map(|t| t.to_rfc3339()),
        Some("2026-01-05T10:00:00+00:00".to_string())
    );
}

#[tokio::test]
async fn absent_substructures_read_as_empty() {
    // An instrument whose creation was interrupted after the metadata claim
    // still answers configuration and snapshot reads.
    let (store, tracker) = tracker();
    store
        .put_if_absent(
            "instrument:sensor-1:meta",
            json!({
                "id": "sensor-1",
                "name": "Sensor",
                "type": "temperature",
                "location": null,
                "last_updated": null,
            }),
        )
        .await
        .unwrap();

    assert!(tracker.get_config("sensor-1").await.unwrap().is_empty());
    assert!(tracker.list_versions("sensor-1").await.unwrap().is_empty());
    assert!(tracker.list_snapshots("sensor-1").await.unwrap().is_empty());
    // Not listed either, since the catalog index append never happened
    assert!(tracker.list_instruments().await.unwrap().is_empty());
}
