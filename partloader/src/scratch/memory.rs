// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory scratch store for testing

use super::traits::ScratchStore;
use super::types::{validate_key, ScratchResult, ScratchType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory scratch store
///
/// Clones share the same map, which lets tests model several invocations
/// that see one execution environment's scratch directory.
#[derive(Clone, Default)]
pub struct MemoryScratch {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryScratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl ScratchStore for MemoryScratch {
    fn read(&self, key: &str) -> ScratchResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.data.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> ScratchResult<()> {
        validate_key(key)?;
        self.data.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn write_if_absent(&self, key: &str, value: &[u8]) -> ScratchResult<bool> {
        validate_key(key)?;
        let mut data = self.data.write();
        if data.contains_key(key) {
            return Ok(false);
        }
        data.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn remove(&self, key: &str) -> ScratchResult<()> {
        validate_key(key)?;
        self.data.write().remove(key);
        Ok(())
    }

    fn contains_key(&self, key: &str) -> ScratchResult<bool> {
        validate_key(key)?;
        Ok(self.data.read().contains_key(key))
    }

    fn scratch_type(&self) -> ScratchType {
        ScratchType::Memory
    }
}
