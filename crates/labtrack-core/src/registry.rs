//! Instrument registry.
//!
//! Owns the catalog of known instruments. Each instrument has its own
//! metadata record; the catalog index is an append-only array of ids. The
//! metadata record is claimed with a conditional write, so id uniqueness
//! holds even for concurrent creators.

use crate::codec;
use crate::error::TrackerError;
use crate::keys;
use crate::model::Instrument;
use labtrack_store::DocumentStore;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Catalog of registered instruments.
pub struct InstrumentRegistry<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> InstrumentRegistry<S> {
    /// Create a registry over a store handle.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All registered instruments, keyed by id.
    ///
    /// An absent catalog index yields an empty map, never an error.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or a record is malformed.
    pub async fn list(&self) -> Result<BTreeMap<String, Instrument>, TrackerError> {
        let Some(index) = self.store.read(keys::CATALOG_INDEX).await? else {
            return Ok(BTreeMap::new());
        };
        let ids: Vec<String> = codec::decode(keys::CATALOG_INDEX, index)?;

        let mut instruments = BTreeMap::new();
        for id in ids {
            match self.get(&id).await? {
                Some(instrument) => {
                    instruments.insert(id, instrument);
                }
                None => {
                    tracing::warn!(
                        instrument_id = %id,
                        "indexed instrument has no metadata record"
                    );
                }
            }
        }
        Ok(instruments)
    }

    /// Look up one instrument's metadata.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or the record is malformed.
    pub async fn get(&self, id: &str) -> Result<Option<Instrument>, TrackerError> {
        let key = keys::instrument_meta(id);
        match self.store.read(&key).await? {
            Some(doc) => Ok(Some(codec::decode(&key, doc)?)),
            None => Ok(None),
        }
    }

    /// Register a new instrument and initialize its substructures.
    ///
    /// The metadata write is the atomic uniqueness claim. The follow-up
    /// initializations and the index append are separate writes; readers
    /// treat absent substructures as empty, which masks a crash between
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InstrumentExists`] if the id is taken, or a
    /// store error.
    pub async fn create(
        &self,
        id: &str,
        name: &str,
        kind: &str,
        location: Option<String>,
    ) -> Result<Instrument, TrackerError> {
        let instrument = Instrument::new(id, name, kind, location);
        let meta_key = keys::instrument_meta(id);

        let claimed = self
            .store
            .put_if_absent(&meta_key, codec::encode(&meta_key, &instrument)?)
            .await?;
        if !claimed {
            return Err(TrackerError::InstrumentExists(id.to_string()));
        }

        self.store
            .write(&keys::config(id), Value::Object(serde_json::Map::new()))
            .await?;
        self.store
            .write(&keys::version_index(id), json!([]))
            .await?;
        self.store
            .write(&keys::snapshot_index(id), json!([]))
            .await?;
        self.store
            .append_to_array(keys::CATALOG_INDEX, json!(id))
            .await?;

        tracing::info!(instrument_id = %id, kind = %instrument.kind, "registered instrument");
        Ok(instrument)
    }
}
