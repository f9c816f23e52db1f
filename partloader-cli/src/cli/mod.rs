// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for partloader
//!
//! Runs one invocation against a catalog snapshot file and inspects or clears
//! the partition cache snapshot.

pub mod commands;
pub mod invoke;
pub mod output;

pub use commands::{CacheAction, Cli, Commands};
pub use invoke::{handle_cache_clear, handle_cache_show, handle_invocation};
