// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Partition reconciliation
//!
//! One reconciliation per created object:
//!
//! ```text
//! object key ─▶ partition path ─▶ load cache (snapshot, else SHOW PARTITIONS + persist)
//!     │
//!     ├─ path lacks a partition name ──────────▶ NotPartitioned
//!     ├─ path in cache ────────────────────────▶ AlreadyRegistered
//!     ├─ lease held by another invocation ─────▶ LeaseHeld
//!     └─ ADD PARTITION
//!           ├─ succeeded / already exists ─────▶ refresh + persist cache ─▶ Registered / AlreadyExisted
//!           └─ failed ─────────────────────────▶ error, cache untouched
//! ```
//!
//! There is no lock around check-then-add. Concurrent invocations racing on
//! the same partition rely on the catalog rejecting the duplicate with an
//! "already exists" failure, which the poller classifies as success.

use crate::config::LoaderConfig;
use crate::error::{LoaderError, LoaderResult};
use crate::event::ObjectCreated;
use crate::partition::{
    fetch_partitions, LeaseAcquisition, PartitionCache, PartitionCacheStore, PartitionKey,
    PartitionLease,
};
use crate::query::{sql, Completion, QueryRunner};
use crate::scratch::ScratchStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The object is not inside a complete partition directory
    NotPartitioned { path: String },
    /// The partition was already in the cache; nothing was submitted
    AlreadyRegistered { partition: String },
    /// The partition was added by this invocation
    Registered { partition: String },
    /// The catalog reported the partition as existing; treated as success
    AlreadyExisted { partition: String },
    /// Another invocation holds the lease for this partition
    LeaseHeld { partition: String },
}

impl ReconcileOutcome {
    /// Whether this invocation submitted an ADD PARTITION
    pub fn submitted_add(&self) -> bool {
        matches!(
            self,
            ReconcileOutcome::Registered { .. } | ReconcileOutcome::AlreadyExisted { .. }
        )
    }
}

impl std::fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileOutcome::NotPartitioned { path } => {
                write!(f, "not a partition directory: {:?}", path)
            }
            ReconcileOutcome::AlreadyRegistered { partition } => {
                write!(f, "already registered: {}", partition)
            }
            ReconcileOutcome::Registered { partition } => write!(f, "registered: {}", partition),
            ReconcileOutcome::AlreadyExisted { partition } => {
                write!(f, "already existed in catalog: {}", partition)
            }
            ReconcileOutcome::LeaseHeld { partition } => {
                write!(f, "lease held elsewhere: {}", partition)
            }
        }
    }
}

pub struct PartitionReconciler {
    runner: QueryRunner,
    table: String,
    partition_keys: Vec<String>,
    cache_store: PartitionCacheStore,
    lease: Option<PartitionLease>,
}

impl PartitionReconciler {
    pub fn new(
        config: &LoaderConfig,
        runner: QueryRunner,
        scratch: Arc<dyn ScratchStore>,
    ) -> LoaderResult<Self> {
        config.validate()?;
        let cache_key = config
            .cache_key()
            .ok_or_else(|| LoaderError::Config("cache file has no file name".to_string()))?;
        let lease = config
            .lease_ttl
            .map(|ttl| PartitionLease::new(scratch.clone(), ttl));

        Ok(Self {
            runner,
            table: config.table.clone(),
            partition_keys: config.partition_keys.clone(),
            cache_store: PartitionCacheStore::new(scratch, cache_key),
            lease,
        })
    }

    /// Stop waiting on executions once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.runner = self.runner.with_cancellation(cancel);
        self
    }

    pub fn cache_store(&self) -> &PartitionCacheStore {
        &self.cache_store
    }

    pub fn reconcile(&self, object: &ObjectCreated) -> LoaderResult<ReconcileOutcome> {
        log::info!("Reconciling s3://{}/{}", object.bucket, object.key);

        let partition = PartitionKey::from_object_key(&object.key);
        let cache = self.load_or_build()?;

        if !partition.contains_all(&self.partition_keys) || partition.is_empty() {
            log::info!(
                "{:?} does not name every partition key {:?}, ignoring",
                partition.as_str(),
                self.partition_keys
            );
            return Ok(ReconcileOutcome::NotPartitioned {
                path: partition.as_str().to_string(),
            });
        }

        if cache.contains(&partition) {
            log::info!("A partition already exists for {}", partition);
            return Ok(ReconcileOutcome::AlreadyRegistered {
                partition: partition.to_string(),
            });
        }

        let guard = match self.acquire_lease(&partition) {
            Some(LeaseAcquisition::HeldElsewhere(_)) => {
                return Ok(ReconcileOutcome::LeaseHeld {
                    partition: partition.to_string(),
                })
            }
            Some(LeaseAcquisition::Acquired(guard)) => Some(guard),
            None => None,
        };

        let statement = sql::add_partition(&self.table, &partition, &object.bucket)?;
        log::info!("Running sql: {}", statement);
        let completion = self.runner.execute(&statement);

        if let Some(guard) = guard {
            if let Err(e) = guard.release() {
                log::warn!("Failed to release lease for {}: {}", partition, e);
            }
        }

        let completion = completion.map_err(|e| {
            log::error!("Error running query to add partition {}: {}", partition, e);
            e
        })?;

        // the partition is registered at this point; a failed refresh only
        // leaves the previous snapshot in place
        match self.refresh() {
            Ok(refreshed) if !refreshed.contains(&partition) => log::warn!(
                "Catalog does not list {} after adding it; cache and catalog disagree on partition names",
                partition
            ),
            Ok(_) => {}
            Err(e) => log::error!(
                "Partition {} is registered but the cache refresh failed: {}",
                partition,
                e
            ),
        }

        Ok(match completion {
            Completion::Succeeded => ReconcileOutcome::Registered {
                partition: partition.to_string(),
            },
            Completion::AlreadyExists => ReconcileOutcome::AlreadyExisted {
                partition: partition.to_string(),
            },
        })
    }

    /// Cache from the snapshot, or rebuilt from the catalog when there is none
    pub fn load_or_build(&self) -> LoaderResult<PartitionCache> {
        match self.cache_store.load()? {
            Some(cache) => {
                log::info!("Partition cache snapshot exists - loaded {} partitions", cache.len());
                Ok(cache)
            }
            None => {
                log::info!("No partition cache snapshot exists - building it");
                self.refresh()
            }
        }
    }

    /// Replace the cache with the catalog's current partitions and persist it
    pub fn refresh(&self) -> LoaderResult<PartitionCache> {
        let cache = fetch_partitions(&self.runner, &self.table)?;
        if let Err(e) = self.cache_store.persist(&cache) {
            log::error!("Failed to persist partition cache: {}", e);
        }
        Ok(cache)
    }

    fn acquire_lease(&self, partition: &PartitionKey) -> Option<LeaseAcquisition> {
        let lease = self.lease.as_ref()?;
        match lease.acquire(partition) {
            Ok(acquisition) => Some(acquisition),
            Err(e) => {
                log::warn!("Lease unavailable for {}, continuing without: {}", partition, e);
                None
            }
        }
    }
}
