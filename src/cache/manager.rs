//! Cache Store Manager.
//!
//! # Responsibilities
//! - Populate the bucket of a version from its manifest
//! - Answer lookups from the authoritative bucket only
//! - Sweep buckets of superseded versions
//!
//! # Design Decisions
//! - All manifest entries are fetched before anything is written
//! - The fetched batch is committed with one `put_all`
//! - A bucket becomes authoritative only through `authorize`
//! - The sweep never stops on the first failed deletion

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use futures_util::future::try_join_all;
use url::Url;

use crate::cache::store::BucketStore;
use crate::error::{PopulationError, ReclaimError, StoreError};
use crate::http::{Request, RequestKey, Response};
use crate::net::NetworkTransport;
use crate::observability::metrics;

/// Outcome of a stale-bucket sweep.
#[derive(Debug, Default)]
pub struct ReclaimReport {
    /// Buckets that were deleted.
    pub deleted: Vec<String>,
    /// Buckets whose deletion failed; they survive until the next sweep.
    pub failures: Vec<ReclaimError>,
}

impl ReclaimReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns the versioned buckets of one service instance.
pub struct CacheStoreManager {
    store: Arc<dyn BucketStore>,
    transport: Arc<dyn NetworkTransport>,
    scope: Url,
    authoritative: ArcSwapOption<String>,
}

impl CacheStoreManager {
    pub fn new(store: Arc<dyn BucketStore>, transport: Arc<dyn NetworkTransport>, scope: Url) -> Self {
        Self {
            store,
            transport,
            scope,
            authoritative: ArcSwapOption::empty(),
        }
    }

    pub fn store(&self) -> &Arc<dyn BucketStore> {
        &self.store
    }

    /// Resolve a manifest entry against the scope.
    pub fn resolve(&self, resource: &str) -> Result<Url, PopulationError> {
        self.scope
            .join(resource)
            .map_err(|_| PopulationError::InvalidResource(resource.to_string()))
    }

    /// Fetch every manifest entry and store it in bucket `version`.
    ///
    /// Returns the number of stored entries. On error nothing from this call
    /// is visible in the bucket.
    pub async fn populate(&self, version: &str, manifest: &[String]) -> Result<usize, PopulationError> {
        let requests = manifest
            .iter()
            .map(|entry| self.resolve(entry).map(Request::get))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(version = %version, resources = requests.len(), "Populating bucket");

        let fetches = requests.into_iter().map(|request| async move {
            let resource = request.url().to_string();
            let response = self
                .transport
                .fetch(&request)
                .await
                .map_err(|source| PopulationError::Fetch {
                    resource: resource.clone(),
                    source,
                })?;
            if !response.is_success() {
                return Err(PopulationError::Status {
                    resource,
                    status: response.status(),
                });
            }
            tracing::debug!(resource = %resource, status = response.status(), "Fetched manifest entry");
            Ok((request.key(), response))
        });
        let entries = try_join_all(fetches).await?;
        let count = entries.len();

        let store_err = |source: StoreError| PopulationError::Store {
            bucket: version.to_string(),
            source,
        };
        let existed = self
            .store
            .list_names()
            .await
            .map_err(store_err)?
            .iter()
            .any(|name| name == version);
        let bucket = self.store.open(version).await.map_err(store_err)?;

        if let Err(source) = bucket.put_all(entries).await {
            if !existed {
                if let Err(e) = self.store.delete(version).await {
                    tracing::warn!(bucket = %version, error = %e, "Failed to discard unpopulated bucket");
                }
            }
            return Err(store_err(source));
        }

        metrics::record_population(count);
        tracing::info!(version = %version, entries = count, "Bucket populated");
        Ok(count)
    }

    /// Make bucket `version` the one lookups read from.
    pub fn authorize(&self, version: &str) {
        self.authoritative.store(Some(Arc::new(version.to_string())));
    }

    /// Stop answering lookups.
    pub fn revoke(&self) {
        self.authoritative.store(None);
    }

    pub fn authoritative(&self) -> Option<String> {
        self.authoritative.load_full().map(|v| String::clone(&v))
    }

    /// Stored response for `key` in the authoritative bucket, if any.
    pub async fn lookup(&self, key: &RequestKey) -> Option<Response> {
        let version = self.authoritative.load_full()?;
        match self.store.lookup(&version, key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(bucket = %version, key = %key, error = %e, "Bucket lookup failed, treating as miss");
                None
            }
        }
    }

    /// Delete every bucket whose name is not `current_version`.
    ///
    /// Fails only when the bucket names cannot be listed; individual deletion
    /// failures are logged and reported.
    pub async fn reclaim_stale(&self, current_version: &str) -> Result<ReclaimReport, StoreError> {
        let names = self.store.list_names().await?;
        let mut report = ReclaimReport::default();

        for name in names.into_iter().filter(|name| name != current_version) {
            match self.store.delete(&name).await {
                Ok(_) => {
                    tracing::info!(bucket = %name, "Deleted stale bucket");
                    report.deleted.push(name);
                }
                Err(source) => {
                    tracing::warn!(bucket = %name, error = %source, "Failed to delete stale bucket");
                    report.failures.push(ReclaimError { bucket: name, source });
                }
            }
        }

        metrics::record_reclaim(report.deleted.len(), report.failures.len());
        Ok(report)
    }
}
