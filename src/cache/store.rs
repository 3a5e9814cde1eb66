//! Storage engine interface.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::http::{RequestKey, Response};

/// Persistent key-value bucket storage.
///
/// Operations are assumed atomic at the storage layer; callers hold no locks.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Open the bucket called `name`, creating it when missing.
    async fn open(&self, name: &str) -> Result<Arc<dyn Bucket>, StoreError>;

    /// Look `key` up in bucket `name` without creating the bucket.
    async fn lookup(&self, name: &str, key: &RequestKey) -> Result<Option<Response>, StoreError>;

    /// Delete bucket `name`. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, StoreError>;

    /// Names of all buckets, sorted.
    async fn list_names(&self) -> Result<Vec<String>, StoreError>;
}

/// Handle to one open bucket.
#[async_trait]
pub trait Bucket: Send + Sync {
    fn name(&self) -> &str;

    async fn put(&self, key: RequestKey, response: Response) -> Result<(), StoreError>;

    /// Commit every entry at once; on error none of them are visible.
    async fn put_all(&self, entries: Vec<(RequestKey, Response)>) -> Result<(), StoreError>;

    async fn get(&self, key: &RequestKey) -> Result<Option<Response>, StoreError>;

    async fn keys(&self) -> Result<Vec<RequestKey>, StoreError>;
}
