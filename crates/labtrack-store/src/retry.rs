//! Bounded retry decorator for transient store failures.

use crate::{DocumentStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Retry policy: bounded attempts with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

/// Decorator that retries [`StoreError::Unavailable`] failures.
///
/// Only transient unavailability is retried; `NotAnArray` and
/// `Serialization` describe the stored data and pass through unchanged.
/// The underlying adapter guarantees a failed operation did not take
/// effect, so a retried append cannot double-apply.
#[derive(Debug, Clone)]
pub struct RetryStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> RetryStore<S> {
    /// Wrap a store with the default policy.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    /// Wrap a store with an explicit policy.
    #[must_use]
    pub fn with_policy(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Access the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn run<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match call().await {
                Err(StoreError::Unavailable(reason)) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.base_delay * 2_u32.saturating_pow(attempt - 1);
                    tracing::warn!(
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %reason,
                        "store unavailable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for RetryStore<S> {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.run("exists", || self.inner.exists(key)).await
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.run("read", || self.inner.read(key)).await
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.run("write", || self.inner.write(key, value.clone()))
            .await
    }

    async fn append_to_array(&self, key: &str, value: Value) -> Result<usize, StoreError> {
        self.run("append_to_array", || {
            self.inner.append_to_array(key, value.clone())
        })
        .await
    }

    async fn put_if_absent(&self, key: &str, value: Value) -> Result<bool, StoreError> {
        self.run("put_if_absent", || {
            self.inner.put_if_absent(key, value.clone())
        })
        .await
    }
}
