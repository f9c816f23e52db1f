// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! partloader CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{CacheAction, Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // -v wins over --log-level; RUST_LOG still applies per module
    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    match cli.command {
        Commands::Version => {
            println!("{} {}", "partloader".bold().green(), partloader::VERSION);
            println!("Event-driven partition registration");
            Ok(())
        }

        Commands::Handle {
            event,
            catalog,
            account_id,
            format,
        } => cli::handle_invocation(event, catalog, account_id, format),

        Commands::Cache { action } => match action {
            CacheAction::Show { format } => cli::handle_cache_show(format),
            CacheAction::Clear => cli::handle_cache_clear(),
        },
    }
}
