// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! partloader - event-driven partition registration for Athena tables
//!
//! When an object lands under a Hive-style prefix such as
//! `data/year=2024/month=01/`, partloader makes sure the table's catalog
//! knows about that partition before anyone queries it.
//!
//! # Features
//!
//! - **Cached partition list**: a snapshot of the catalog's partitions lives in
//!   scratch storage so most events never reach the catalog
//! - **Idempotent registration**: an "already exists" conflict from a racing
//!   invocation counts as success
//! - **Bounded polling**: fixed or exponential backoff with an attempt limit and
//!   cooperative cancellation
//! - **Pluggable scratch storage**: file, sled or in-memory backends
//!
//! # Usage
//!
//! ```bash
//! export ATHENA_REGION=us-east-1 ATHENA_DATABASE=logs ATHENA_TABLE=events
//! export PARTITION_KEYS=year,month
//! partloader handle --event event.json --catalog catalog.json --account-id 123456789012
//! ```

// Public modules - exposed to external users
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod identity;
pub mod partition;
pub mod query;
pub mod reconciler;
pub mod scratch;

pub use config::{LoaderConfig, StatusMode};
pub use error::{LoaderError, LoaderResult};
pub use event::{ObjectCreated, StorageEvent};
pub use handler::{PartitionHandler, SUCCESS_STATUS};
pub use identity::{AccountIdentity, IdentityResolver, StaticIdentity};
pub use partition::{PartitionCache, PartitionKey};
pub use query::{MemoryQueryEngine, PollPolicy, QueryEngine};
pub use reconciler::{PartitionReconciler, ReconcileOutcome};
pub use scratch::{ScratchStore, ScratchType};

/// partloader version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// partloader crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
