// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Scratch store factory

use super::file::FileScratch;
use super::memory::MemoryScratch;
use super::traits::ScratchStore;
use super::types::{ScratchResult, ScratchType};
use std::path::Path;

/// Create a scratch store rooted at `root`
///
/// # Arguments
/// * `scratch_type` - Backend to create
/// * `root` - Directory holding the store; ignored by the memory backend
///
/// # Examples
/// ```ignore
/// let store = create_scratch_store(ScratchType::File, "/tmp")?;
/// store.write("partitions", b"[]")?;
/// ```
pub fn create_scratch_store<P: AsRef<Path>>(
    scratch_type: ScratchType,
    root: P,
) -> ScratchResult<Box<dyn ScratchStore>> {
    match scratch_type {
        ScratchType::File => Ok(Box::new(FileScratch::open(root)?) as Box<dyn ScratchStore>),
        #[cfg(feature = "sled-backend")]
        ScratchType::Sled => {
            use super::sled::SledScratch;
            let store = SledScratch::open(root.as_ref().join("partloader.sled"))?;
            Ok(Box::new(store) as Box<dyn ScratchStore>)
        }
        #[cfg(not(feature = "sled-backend"))]
        ScratchType::Sled => Err(super::types::ScratchError::BackendSpecific(
            "sled backend not compiled in (enable the sled-backend feature)".to_string(),
        )),
        ScratchType::Memory => Ok(Box::new(MemoryScratch::new()) as Box<dyn ScratchStore>),
    }
}
