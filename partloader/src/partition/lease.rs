// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Short-lived partition leases
//!
//! Invocations sharing a scratch store can use a lease to avoid submitting
//! the same ADD PARTITION at the same time. This only reduces duplicates:
//! invocations with different scratch stores never see each other's leases,
//! and an expired lease is taken over without a compare step. The catalog's
//! "already exists" rejection remains the correctness guarantee.

use super::key::PartitionKey;
use crate::error::LoaderResult;
use crate::scratch::ScratchStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const LEASE_PREFIX: &str = "lease";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseInfo {
    pub holder_id: String,
    pub partition: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LeaseInfo {
    fn new(holder_id: &str, partition: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            holder_id: holder_id.to_string(),
            partition: partition.to_string(),
            acquired_at: now,
            expires_at: now
                + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(30)),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[derive(Debug)]
pub enum LeaseAcquisition {
    Acquired(LeaseGuard),
    /// Another live holder owns the lease
    HeldElsewhere(LeaseInfo),
}

pub struct PartitionLease {
    store: Arc<dyn ScratchStore>,
    ttl: Duration,
    holder_id: String,
}

impl PartitionLease {
    pub fn new(store: Arc<dyn ScratchStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            holder_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    pub fn acquire(&self, partition: &PartitionKey) -> LoaderResult<LeaseAcquisition> {
        let key = lease_key(partition);
        let info = LeaseInfo::new(&self.holder_id, partition.as_str(), self.ttl);
        let bytes = serde_json::to_vec(&info)?;

        if self.store.write_if_absent(&key, &bytes)? {
            log::debug!("Acquired lease {} for {}", key, self.holder_id);
            return Ok(LeaseAcquisition::Acquired(self.guard(key)));
        }

        let existing = self
            .store
            .read(&key)?
            .and_then(|raw| serde_json::from_slice::<LeaseInfo>(&raw).ok());

        match existing {
            Some(current) if current.partition != partition.as_str() => {
                log::warn!(
                    "Lease {} names {:?}, not {}; replacing it",
                    key,
                    current.partition,
                    partition
                );
                self.store.write(&key, &bytes)?;
                Ok(LeaseAcquisition::Acquired(self.guard(key)))
            }
            Some(current) if current.holder_id == self.holder_id => {
                Ok(LeaseAcquisition::Acquired(self.guard(key)))
            }
            Some(current) if !current.is_expired() => {
                log::info!(
                    "Partition {} is leased by {} until {}",
                    partition,
                    current.holder_id,
                    current.expires_at
                );
                Ok(LeaseAcquisition::HeldElsewhere(current))
            }
            _ => {
                log::info!("Taking over stale lease {}", key);
                self.store.write(&key, &bytes)?;
                Ok(LeaseAcquisition::Acquired(self.guard(key)))
            }
        }
    }

    fn guard(&self, key: String) -> LeaseGuard {
        LeaseGuard {
            store: self.store.clone(),
            key,
            holder_id: self.holder_id.clone(),
            released: false,
        }
    }
}

/// Releases the lease on drop if it was not released explicitly
pub struct LeaseGuard {
    store: Arc<dyn ScratchStore>,
    key: String,
    holder_id: String,
    released: bool,
}

impl std::fmt::Debug for LeaseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseGuard")
            .field("key", &self.key)
            .field("holder_id", &self.holder_id)
            .field("released", &self.released)
            .finish()
    }
}

impl LeaseGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn release(mut self) -> LoaderResult<()> {
        self.released = true;
        self.remove_if_owned()
    }

    fn remove_if_owned(&self) -> LoaderResult<()> {
        let owned = self
            .store
            .read(&self.key)?
            .and_then(|raw| serde_json::from_slice::<LeaseInfo>(&raw).ok())
            .map(|info| info.holder_id == self.holder_id)
            .unwrap_or(false);
        if owned {
            self.store.remove(&self.key)?;
        }
        Ok(())
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.remove_if_owned() {
                log::warn!("Failed to release lease {}: {}", self.key, e);
            }
        }
    }
}

/// One flat scratch key per partition
///
/// `~` and `/` are escaped as `~7e` and `~2f`, so distinct partitions never
/// share a key.
fn lease_key(partition: &PartitionKey) -> String {
    let mut key = String::with_capacity(LEASE_PREFIX.len() + 1 + partition.as_str().len());
    key.push_str(LEASE_PREFIX);
    key.push('/');
    for c in partition.as_str().chars() {
        match c {
            '~' => key.push_str("~7e"),
            '/' => key.push_str("~2f"),
            c => key.push(c),
        }
    }
    key
}
