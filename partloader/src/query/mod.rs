// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog query execution
//!
//! Statements go through three steps, each with its own component:
//! [`QueryClient`] submits, [`CompletionPoller`] waits for a terminal state,
//! and [`ResultReader`] pages out rows. [`QueryRunner`] chains them.

pub mod client;
pub mod engine;
pub mod memory;
pub mod poller;
pub mod results;
pub mod runner;
pub mod sql;

pub use client::{QueryClient, QueryHandle};
pub use engine::{
    EngineError, QueryEngine, QueryExecutionStatus, QueryState, ResultPage, ResultRow,
    StartQueryRequest, StartQueryResponse,
};
pub use memory::{CatalogSnapshot, MemoryQueryEngine, ScriptedOutcome};
pub use poller::{Backoff, Completion, CompletionPoller, PollPolicy, ALREADY_EXISTS_MARKER};
pub use results::{ResultReader, ResultTuple};
pub use runner::QueryRunner;
