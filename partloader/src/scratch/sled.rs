// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Sled scratch store implementation

use super::traits::ScratchStore;
use super::types::{validate_key, ScratchError, ScratchResult, ScratchType};
use std::path::Path;

const SCRATCH_TREE: &str = "partloader_scratch";

pub struct SledScratch {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledScratch {
    pub fn open<P: AsRef<Path>>(path: P) -> ScratchResult<Self> {
        let db =
            sled::open(path).map_err(|e| ScratchError::BackendSpecific(e.to_string()))?;
        let tree = db
            .open_tree(SCRATCH_TREE)
            .map_err(|e| ScratchError::BackendSpecific(e.to_string()))?;
        Ok(Self { db, tree })
    }
}

impl ScratchStore for SledScratch {
    fn read(&self, key: &str) -> ScratchResult<Option<Vec<u8>>> {
        validate_key(key)?;
        self.tree
            .get(key.as_bytes())
            .map_err(|e| ScratchError::BackendSpecific(e.to_string()))
            .map(|opt| opt.map(|v| v.to_vec()))
    }

    fn write(&self, key: &str, value: &[u8]) -> ScratchResult<()> {
        validate_key(key)?;
        self.tree
            .insert(key.as_bytes(), value)
            .map_err(|e| ScratchError::BackendSpecific(e.to_string()))?;
        self.flush()
    }

    fn write_if_absent(&self, key: &str, value: &[u8]) -> ScratchResult<bool> {
        validate_key(key)?;
        let swapped = self
            .tree
            .compare_and_swap(key.as_bytes(), None as Option<&[u8]>, Some(value))
            .map_err(|e| ScratchError::BackendSpecific(e.to_string()))?;
        match swapped {
            Ok(()) => {
                self.flush()?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    fn remove(&self, key: &str) -> ScratchResult<()> {
        validate_key(key)?;
        self.tree
            .remove(key.as_bytes())
            .map_err(|e| ScratchError::BackendSpecific(e.to_string()))?;
        self.flush()
    }

    fn contains_key(&self, key: &str) -> ScratchResult<bool> {
        validate_key(key)?;
        self.tree
            .contains_key(key.as_bytes())
            .map_err(|e| ScratchError::BackendSpecific(e.to_string()))
    }

    fn flush(&self) -> ScratchResult<()> {
        self.db
            .flush()
            .map_err(|e| ScratchError::BackendSpecific(e.to_string()))?;
        Ok(())
    }

    fn scratch_type(&self) -> ScratchType {
        ScratchType::Sled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sled_round_trip_and_cas() {
        let temp_dir = TempDir::new().unwrap();
        let store = SledScratch::open(temp_dir.path().join("scratch.sled")).unwrap();

        store.write("partitions", b"[\"x\"]").unwrap();
        assert_eq!(store.read("partitions").unwrap(), Some(b"[\"x\"]".to_vec()));

        assert!(store.write_if_absent("lease/x", b"1").unwrap());
        assert!(!store.write_if_absent("lease/x", b"2").unwrap());

        store.remove("lease/x").unwrap();
        assert!(!store.contains_key("lease/x").unwrap());
    }
}
