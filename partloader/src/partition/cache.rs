// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Partition cache
//!
//! A local view of which partitions the catalog had registered at the last
//! refresh. It is only ever replaced wholesale, either from a snapshot in
//! scratch storage or from a fresh `SHOW PARTITIONS` run, and every fresh run
//! is written back as the new snapshot.
//!
//! The snapshot is a JSON array of canonical partition strings. The same
//! shape is read and written, sorted so that persisting an unchanged cache
//! produces identical bytes.

use super::key::PartitionKey;
use crate::error::{LoaderError, LoaderResult};
use crate::query::{sql, QueryRunner, ResultTuple};
use crate::scratch::ScratchStore;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartitionCache {
    partitions: BTreeSet<String>,
}

impl PartitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_partitions<I, S>(partitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            partitions: partitions.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from `SHOW PARTITIONS` rows; the first cell of each row is the
    /// partition string. Rows without a value are skipped.
    pub fn from_rows(rows: Vec<ResultTuple>) -> Self {
        let mut partitions = BTreeSet::new();
        for row in rows {
            match partition_cell(row) {
                Ok(partition) => {
                    partitions.insert(partition);
                }
                Err(e) => log::warn!("Skipping partition row: {}", e),
            }
        }
        Self { partitions }
    }

    pub fn contains(&self, partition: &PartitionKey) -> bool {
        self.partitions.contains(partition.as_str())
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.partitions.contains(path)
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.partitions.iter().map(String::as_str)
    }

    pub fn to_snapshot(&self) -> LoaderResult<Vec<u8>> {
        let partitions: Vec<&String> = self.partitions.iter().collect();
        Ok(serde_json::to_vec(&partitions)?)
    }

    pub fn from_snapshot(bytes: &[u8]) -> LoaderResult<Self> {
        let partitions: Vec<String> = serde_json::from_slice(bytes)?;
        Ok(Self::from_partitions(partitions))
    }
}

/// Reads and writes the cache snapshot in scratch storage
#[derive(Clone)]
pub struct PartitionCacheStore {
    store: Arc<dyn ScratchStore>,
    key: String,
}

impl PartitionCacheStore {
    pub fn new(store: Arc<dyn ScratchStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the snapshot, if one exists
    ///
    /// An unreadable snapshot is reported as absent so the caller rebuilds it.
    pub fn load(&self) -> LoaderResult<Option<PartitionCache>> {
        let Some(bytes) = self.store.read(&self.key)? else {
            return Ok(None);
        };
        match PartitionCache::from_snapshot(&bytes) {
            Ok(cache) => Ok(Some(cache)),
            Err(e) => {
                log::warn!("Ignoring unreadable partition snapshot {}: {}", self.key, e);
                Ok(None)
            }
        }
    }

    /// Overwrite the snapshot with `cache`
    pub fn persist(&self, cache: &PartitionCache) -> LoaderResult<()> {
        self.store.write(&self.key, &cache.to_snapshot()?)?;
        log::debug!("Persisted {} partitions to {}", cache.len(), self.key);
        Ok(())
    }

    pub fn clear(&self) -> LoaderResult<()> {
        self.store.remove(&self.key)?;
        Ok(())
    }
}

/// The partition string of one `SHOW PARTITIONS` row
fn partition_cell(row: ResultTuple) -> LoaderResult<String> {
    let arity = row.len();
    match row.into_iter().next() {
        Some(partition) if !partition.is_empty() => {
            if arity > 1 {
                log::warn!(
                    "{}",
                    LoaderError::UnexpectedRow(format!(
                        "expected 1 cell, got {}; using {:?}",
                        arity, partition
                    ))
                );
            }
            Ok(partition)
        }
        Some(_) => Err(LoaderError::UnexpectedRow("empty partition cell".to_string())),
        None => Err(LoaderError::UnexpectedRow("row has no cells".to_string())),
    }
}

/// Read the table's registered partitions from the catalog
pub fn fetch_partitions(runner: &QueryRunner, table: &str) -> LoaderResult<PartitionCache> {
    let rows = runner.query_rows(&sql::show_partitions(table), false)?;
    let cache = PartitionCache::from_rows(rows);
    log::info!("Catalog reports {} partitions for {}", cache.len(), table);
    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratch::MemoryScratch;

    #[test]
    fn test_partition_row_arity() {
        assert_eq!(
            partition_cell(vec!["a/year=1".to_string(), "extra".to_string()]).unwrap(),
            "a/year=1"
        );
        assert!(matches!(
            partition_cell(vec![]),
            Err(LoaderError::UnexpectedRow(_))
        ));
        assert!(matches!(
            partition_cell(vec![String::new()]),
            Err(LoaderError::UnexpectedRow(_))
        ));
    }

    #[test]
    fn test_from_rows_takes_first_cell() {
        let cache = PartitionCache::from_rows(vec![
            vec!["b/year=2".to_string(), "extra".to_string()],
            vec![],
            vec!["a/year=1".to_string()],
            vec![String::new()],
        ]);
        assert_eq!(cache.iter().collect::<Vec<_>>(), vec!["a/year=1", "b/year=2"]);
    }

    #[test]
    fn test_snapshot_shape_is_array_of_strings() {
        let cache = PartitionCache::from_partitions(["z", "a"]);
        let bytes = cache.to_snapshot().unwrap();
        assert_eq!(String::from_utf8(bytes.clone()).unwrap(), r#"["a","z"]"#);
        assert_eq!(PartitionCache::from_snapshot(&bytes).unwrap(), cache);
    }

    #[test]
    fn test_persist_twice_is_identical() {
        let scratch = MemoryScratch::new();
        let store = PartitionCacheStore::new(Arc::new(scratch.clone()), "partitions");
        let cache = PartitionCache::from_partitions(["data/year=2024/month=01", "data/year=2023/month=12"]);

        store.persist(&cache).unwrap();
        let first = scratch.read("partitions").unwrap().unwrap();
        let loaded = store.load().unwrap().unwrap();
        store.persist(&loaded).unwrap();
        let second = scratch.read("partitions").unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(loaded, cache);
    }

    #[test]
    fn test_missing_and_corrupt_snapshots_load_as_none() {
        let scratch = MemoryScratch::new();
        let store = PartitionCacheStore::new(Arc::new(scratch.clone()), "partitions");
        assert_eq!(store.load().unwrap(), None);

        scratch.write("partitions", b"{\"not\": \"an array\"}").unwrap();
        assert_eq!(store.load().unwrap(), None);

        store.clear().unwrap();
        assert!(!scratch.contains_key("partitions").unwrap());
    }

    #[test]
    fn test_contains_uses_canonical_form() {
        let cache = PartitionCache::from_partitions(["data/year=2024/month=01"]);
        assert!(cache.contains(&PartitionKey::from_object_key("data/year=2024/month=01/f.csv")));
        assert!(!cache.contains(&PartitionKey::from_object_key("data/year=2024/month=02/f.csv")));
        assert!(cache.contains_path("data/year=2024/month=01"));
    }
}
