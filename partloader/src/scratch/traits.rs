// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Scratch store trait
//!
//! A small key to bytes facility. No concurrency guarantees are assumed
//! beyond `write_if_absent`, which every backend implements atomically.

use super::types::{ScratchResult, ScratchType};
use std::sync::Arc;

pub trait ScratchStore: Send + Sync {
    /// Read the value stored under `key`, if any
    fn read(&self, key: &str) -> ScratchResult<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value
    fn write(&self, key: &str, value: &[u8]) -> ScratchResult<()>;

    /// Write `value` only when `key` is absent. Returns `false` when the key
    /// already existed and nothing was written.
    fn write_if_absent(&self, key: &str, value: &[u8]) -> ScratchResult<bool>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> ScratchResult<()>;

    /// Check if a key exists
    fn contains_key(&self, key: &str) -> ScratchResult<bool> {
        Ok(self.read(key)?.is_some())
    }

    /// Flush any pending writes to disk
    fn flush(&self) -> ScratchResult<()> {
        Ok(())
    }

    fn scratch_type(&self) -> ScratchType;
}

impl ScratchStore for Box<dyn ScratchStore> {
    fn read(&self, key: &str) -> ScratchResult<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &[u8]) -> ScratchResult<()> {
        (**self).write(key, value)
    }

    fn write_if_absent(&self, key: &str, value: &[u8]) -> ScratchResult<bool> {
        (**self).write_if_absent(key, value)
    }

    fn remove(&self, key: &str) -> ScratchResult<()> {
        (**self).remove(key)
    }

    fn contains_key(&self, key: &str) -> ScratchResult<bool> {
        (**self).contains_key(key)
    }

    fn flush(&self) -> ScratchResult<()> {
        (**self).flush()
    }

    fn scratch_type(&self) -> ScratchType {
        (**self).scratch_type()
    }
}

impl<S: ScratchStore + ?Sized> ScratchStore for Arc<S> {
    fn read(&self, key: &str) -> ScratchResult<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &[u8]) -> ScratchResult<()> {
        (**self).write(key, value)
    }

    fn write_if_absent(&self, key: &str, value: &[u8]) -> ScratchResult<bool> {
        (**self).write_if_absent(key, value)
    }

    fn remove(&self, key: &str) -> ScratchResult<()> {
        (**self).remove(key)
    }

    fn contains_key(&self, key: &str) -> ScratchResult<bool> {
        (**self).contains_key(key)
    }

    fn flush(&self) -> ScratchResult<()> {
        (**self).flush()
    }

    fn scratch_type(&self) -> ScratchType {
        (**self).scratch_type()
    }
}
