use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use super::{ObjectInfo, ObjectStore};
use crate::error::{IngestError, Result};

type Objects = BTreeMap<String, std::result::Result<Vec<u8>, String>>;

/// In-memory object store for development/testing.
/// Objects list in name order; an object can be registered as failing.
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    buckets: Arc<Mutex<BTreeMap<String, Objects>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, name: &str, bytes: impl Into<Vec<u8>>) {
        self.put(bucket, name, Ok(bytes.into()));
    }

    /// Register an object whose download always fails with `message`.
    pub fn insert_failing(&self, bucket: &str, name: &str, message: &str) {
        self.put(bucket, name, Err(message.to_string()));
    }

    fn put(&self, bucket: &str, name: &str, entry: std::result::Result<Vec<u8>, String>) {
        let mut buckets = self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(name.to_string(), entry);
        debug!(bucket, file_name = %name, "Stored in-memory object");
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_objects(&self, bucket: &str, max_results: Option<usize>) -> Result<Vec<ObjectInfo>> {
        let buckets = self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let objects = buckets.get(bucket).ok_or_else(|| IngestError::Store {
            message: format!("bucket '{}' does not exist", bucket),
        })?;

        Ok(objects
            .iter()
            .take(max_results.unwrap_or(usize::MAX))
            .map(|(name, entry)| ObjectInfo {
                name: name.clone(),
                size: entry.as_ref().ok().map(|b| b.len() as u64),
            })
            .collect())
    }

    async fn fetch(&self, bucket: &str, name: &str) -> Result<Vec<u8>> {
        let buckets = self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match buckets.get(bucket).and_then(|objects| objects.get(name)) {
            Some(Ok(bytes)) => Ok(bytes.clone()),
            Some(Err(message)) => Err(IngestError::Store { message: message.clone() }),
            None => Err(IngestError::Store {
                message: format!("object '{}' not found in bucket '{}'", name, bucket),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_respects_max_results() {
        let store = InMemoryObjectStore::new();
        store.insert("b", "c.csv", "x");
        store.insert("b", "a.csv", "xy");
        store.insert("b", "b.csv", "xyz");

        let all = store.list_objects("b", None).await.unwrap();
        let names: Vec<_> = all.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a.csv", "b.csv", "c.csv"]);
        assert_eq!(all[0].size, Some(2));

        let two = store.list_objects("b", Some(2)).await.unwrap();
        assert_eq!(two.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failures() {
        let store = InMemoryObjectStore::new();
        store.insert_failing("b", "broken.csv", "connection reset");

        let err = store.fetch("b", "broken.csv").await.unwrap_err();
        assert_eq!(err.to_string(), "Object store error: connection reset");
        assert!(store.fetch("b", "missing.csv").await.is_err());
        assert!(store.list_objects("nope", None).await.is_err());
    }
}
