//! # labtrack store
//!
//! Key-addressed JSON document store contract and adapters.
//!
//! This crate provides:
//! - The [`DocumentStore`] trait the tracking core is written against
//! - [`MemoryStore`], an in-process adapter for tests and ephemeral use
//! - [`SqliteStore`], a durable single-file adapter
//! - [`RetryStore`], a decorator adding bounded retry for transient failures
//!
//! Every operation is atomic at single-key granularity; no multi-key
//! transactions are assumed anywhere in the contract.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod retry;
pub mod sqlite;

pub use memory::MemoryStore;
pub use retry::{RetryPolicy, RetryStore};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde_json::Value;

/// Errors that can occur against a document store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store failed to respond or errored mid-operation.
    ///
    /// Adapters surface this only for failures where the operation did not
    /// take effect, so callers may safely retry it.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An array operation hit a document that is not an array.
    #[error("document at {key} is not an array")]
    NotAnArray {
        /// Key of the offending document
        key: String,
    },

    /// A stored document could not be encoded or decoded as JSON.
    #[error("serialization error at {key}: {reason}")]
    Serialization {
        /// Key of the offending document
        key: String,
        /// Underlying serde error text
        reason: String,
    },
}

/// A key-addressed JSON document store.
///
/// Whole documents are read and written per key. The only conditional
/// primitive is [`put_if_absent`](DocumentStore::put_if_absent), which
/// adapters must implement atomically: of any number of concurrent callers
/// for the same key, exactly one observes `true`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Check whether a document exists.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Read a whole document, or `None` if absent.
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write a whole document, overwriting any previous content.
    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Append a value to an array document and return the new length.
    ///
    /// An absent document is created as a one-element array. A present
    /// non-array document fails with [`StoreError::NotAnArray`].
    async fn append_to_array(&self, key: &str, value: Value) -> Result<usize, StoreError>;

    /// Write a document only if the key is absent.
    ///
    /// Returns `true` iff this call created the document.
    async fn put_if_absent(&self, key: &str, value: Value) -> Result<bool, StoreError>;
}
