//! In-process bucket store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::cache::store::{Bucket, BucketStore};
use crate::error::StoreError;
use crate::http::{RequestKey, Response};

/// Bucket store backed by process memory.
///
/// Cheap to clone; clones share the same buckets.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<DashMap<String, Arc<MemoryBucket>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buckets currently held.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl BucketStore for MemoryStore {
    async fn open(&self, name: &str) -> Result<Arc<dyn Bucket>, StoreError> {
        validate_name(name)?;
        let bucket = self
            .buckets
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(bucket = %name, "Creating bucket");
                Arc::new(MemoryBucket::new(name))
            })
            .clone();
        Ok(bucket)
    }

    async fn lookup(&self, name: &str, key: &RequestKey) -> Result<Option<Response>, StoreError> {
        let bucket = match self.buckets.get(name) {
            Some(bucket) => bucket.clone(),
            None => return Ok(None),
        };
        bucket.read(key)
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        match self.buckets.remove(name) {
            Some((_, bucket)) => {
                bucket.deleted.store(true, Ordering::SeqCst);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.buckets.iter().map(|r| r.key().clone()).collect();
        names.sort();
        Ok(names)
    }
}

/// A single in-memory bucket.
#[derive(Debug)]
pub struct MemoryBucket {
    name: String,
    entries: RwLock<HashMap<RequestKey, Response>>,
    deleted: AtomicBool,
}

impl MemoryBucket {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(HashMap::new()),
            deleted: AtomicBool::new(false),
        }
    }

    fn ensure_live(&self) -> Result<(), StoreError> {
        if self.deleted.load(Ordering::SeqCst) {
            return Err(StoreError::Deleted(self.name.clone()));
        }
        Ok(())
    }

    fn poisoned(&self) -> StoreError {
        StoreError::Backend(format!("bucket {} lock poisoned", self.name))
    }

    fn read(&self, key: &RequestKey) -> Result<Option<Response>, StoreError> {
        let entries = self.entries.read().map_err(|_| self.poisoned())?;
        Ok(entries.get(key).cloned())
    }
}

#[async_trait]
impl Bucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: RequestKey, response: Response) -> Result<(), StoreError> {
        self.ensure_live()?;
        let mut entries = self.entries.write().map_err(|_| self.poisoned())?;
        entries.insert(key, response);
        Ok(())
    }

    async fn put_all(&self, batch: Vec<(RequestKey, Response)>) -> Result<(), StoreError> {
        self.ensure_live()?;
        // One write guard for the whole batch: readers see all of it or none.
        let mut entries = self.entries.write().map_err(|_| self.poisoned())?;
        entries.extend(batch);
        Ok(())
    }

    async fn get(&self, key: &RequestKey) -> Result<Option<Response>, StoreError> {
        self.ensure_live()?;
        self.read(key)
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, StoreError> {
        self.ensure_live()?;
        let entries = self.entries.read().map_err(|_| self.poisoned())?;
        let mut keys: Vec<RequestKey> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
