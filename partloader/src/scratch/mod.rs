// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Local scratch storage
//!
//! Holds the partition cache snapshot and, when enabled, partition leases.
//! Backends are interchangeable behind [`ScratchStore`]:
//!
//! ```text
//! PartitionCache / PartitionLease
//!     ↓
//! ScratchStore (key → bytes)
//!     ↓
//! FileScratch | SledScratch | MemoryScratch
//! ```

pub mod factory;
pub mod file;
pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;
pub mod traits;
pub mod types;

pub use factory::create_scratch_store;
pub use file::FileScratch;
pub use memory::MemoryScratch;
pub use traits::ScratchStore;
pub use types::{ScratchError, ScratchResult, ScratchType};
