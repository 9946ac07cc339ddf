//! In-memory document store.
//!
//! The adapter of choice for tests: deterministic, clone-shareable, and able
//! to inject transient failures for exercising retry paths.

use crate::{DocumentStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process document store.
///
/// Clones share the same underlying map, so a store handed to several
/// components behaves like one shared backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    docs: HashMap<String, Value>,
    /// Remaining operations to fail with `Unavailable` (test hook).
    fail_remaining: usize,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `failures` operations fail with [`StoreError::Unavailable`].
    ///
    /// Failed operations do not touch the stored documents.
    pub async fn fail_next(&self, failures: usize) {
        self.inner.write().await.fail_remaining = failures;
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.inner.read().await.docs.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.docs.is_empty()
    }
}

impl Inner {
    fn check_injected_failure(&mut self) -> Result<(), StoreError> {
        if self.fail_remaining > 0 {
            self.fail_remaining -= 1;
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_injected_failure()?;
        Ok(inner.docs.contains_key(key))
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_injected_failure()?;
        Ok(inner.docs.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_injected_failure()?;
        inner.docs.insert(key.to_string(), value);
        Ok(())
    }

    async fn append_to_array(&self, key: &str, value: Value) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_injected_failure()?;
        let doc = inner
            .docs
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let Some(items) = doc.as_array_mut() else {
            return Err(StoreError::NotAnArray {
                key: key.to_string(),
            });
        };
        items.push(value);
        Ok(items.len())
    }

    async fn put_if_absent(&self, key: &str, value: Value) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_injected_failure()?;
        if inner.docs.contains_key(key) {
            return Ok(false);
        }
        inner.docs.insert(key.to_string(), value);
        Ok(true)
    }
}
