//! RecordStore port - keyed durable storage.
//!
//! Both the lock record and the progress record live behind this trait.
//! The one non-negotiable capability is atomic create-if-absent: that is
//! what makes exclusive lock acquisition possible at all. Everything else
//! is plain keyed upsert/read/delete.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;

/// Keyed durable store with atomic "create if absent" semantics.
///
/// Design:
/// - `get` distinguishes absence (`Ok(None)`) from a failed read
///   (`Err(_)`). Callers rely on this: a missing progress record means
///   "start fresh", a read error must not be mistaken for that.
/// - Values are JSON documents; the store does not interpret them.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Atomically create `key` iff it does not exist.
    ///
    /// Returns `Ok(true)` when this caller won the creation, `Ok(false)`
    /// when the key was already present.
    async fn create(&self, key: &str, value: Value) -> Result<bool, StoreError>;

    /// Read the document at `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Upsert the document at `key`.
    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Delete `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
