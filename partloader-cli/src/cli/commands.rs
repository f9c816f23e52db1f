// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "partloader")]
#[command(version, about = "Register Athena partitions for newly created objects")]
#[command(
    long_about = "Reads table settings from ATHENA_REGION, ATHENA_DATABASE, ATHENA_TABLE and \
PARTITION_KEYS, then reconciles the object named by a storage notification."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<log::Level>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Handle one storage notification
    Handle {
        /// Notification JSON file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        event: String,

        /// Catalog snapshot file; created if missing and updated afterwards
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Account id used for the query result location
        #[arg(long)]
        account_id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Inspect or reset the partition cache snapshot
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached partitions
    Show {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Remove the snapshot so the next invocation rebuilds it
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
