//! In-memory store, for tests and single-process demos.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::errors::StoreError;
use crate::ports::RecordStore;

/// HashMap behind a mutex. Create-if-absent is atomic simply because every
/// operation holds the one lock.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, key: &str, value: Value) -> Result<bool, StoreError> {
        let mut records = self.records.lock().await;
        if records.contains_key(key) {
            return Ok(false);
        }
        records.insert(key.to_string(), value);
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let records = self.records.lock().await;
        Ok(records.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        records.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        records.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_is_exclusive() {
        let store = MemoryStore::new();
        assert!(store.create("k", json!({"a": 1})).await.unwrap());
        assert!(!store.create("k", json!({"a": 2})).await.unwrap());

        // The loser did not overwrite.
        let value = store.get("k").await.unwrap().unwrap();
        assert_eq!(value["a"], 1);
    }

    #[tokio::test]
    async fn delete_then_create_succeeds() {
        let store = MemoryStore::new();
        assert!(store.create("k", json!(1)).await.unwrap());
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.create("k", json!(2)).await.unwrap());
    }

    #[tokio::test]
    async fn get_absent_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }
}
