// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Partition keys, the partition cache and partition leases

pub mod cache;
pub mod key;
pub mod lease;

pub use cache::{fetch_partitions, PartitionCache, PartitionCacheStore};
pub use key::{contains_all_partition_keys, partition_path, PartitionKey};
pub use lease::{LeaseAcquisition, LeaseGuard, LeaseInfo, PartitionLease};
