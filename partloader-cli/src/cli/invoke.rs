// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Command handlers

use super::commands::OutputFormat;
use super::output::OutcomeFormatter;
use colored::Colorize;
use partloader::identity::CachedIdentityResolver;
use partloader::partition::PartitionCacheStore;
use partloader::query::CatalogSnapshot;
use partloader::scratch::create_scratch_store;
use partloader::{
    AccountIdentity, LoaderConfig, MemoryQueryEngine, PartitionHandler, StaticIdentity,
    StorageEvent,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle the `handle` command (one invocation)
pub fn handle_invocation(
    event: String,
    catalog: Option<PathBuf>,
    account_id: String,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = LoaderConfig::from_env()?;
    let payload = read_payload(&event)?;

    let engine = Arc::new(load_catalog(catalog.as_deref())?);
    engine.create_table(&config.database, &config.table);

    let resolver = CachedIdentityResolver::new(StaticIdentity::new(account_id));
    let identity = AccountIdentity::resolve(&resolver, &config.region)?;
    let handler = PartitionHandler::from_config(config, engine.clone(), identity)?;

    let result = StorageEvent::from_json(&payload).and_then(|e| handler.reconcile_event(&e));
    let outcome = result.as_ref().ok().cloned();
    if let Err(e) = &result {
        eprintln!("{}", format!("Error: {}", e).red());
    }
    let status = handler.status_for(result);

    if let Some(path) = &catalog {
        save_catalog(path, &engine.snapshot())?;
    }

    let status = status?;
    println!("{}", OutcomeFormatter::format(outcome.as_ref(), status, format));
    Ok(())
}

/// Handle `cache show`
pub fn handle_cache_show(format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let store = cache_store()?;
    match store.load()? {
        Some(cache) => {
            println!("{}", OutcomeFormatter::format_cache(&cache, format));
        }
        None => println!("{}", "No partition cache snapshot".yellow()),
    }
    Ok(())
}

/// Handle `cache clear`
pub fn handle_cache_clear() -> Result<(), Box<dyn std::error::Error>> {
    let store = cache_store()?;
    store.clear()?;
    println!("{} {}", "Cleared".bold().green(), store.key());
    Ok(())
}

fn cache_store() -> Result<PartitionCacheStore, Box<dyn std::error::Error>> {
    let config = LoaderConfig::from_env()?;
    let key = config.cache_key().ok_or("cache file has no file name")?;
    let scratch = create_scratch_store(config.scratch_backend, config.cache_dir())?;
    Ok(PartitionCacheStore::new(Arc::from(scratch), key))
}

fn read_payload(source: &str) -> Result<String, Box<dyn std::error::Error>> {
    if source == "-" {
        let mut payload = String::new();
        std::io::stdin().read_to_string(&mut payload)?;
        Ok(payload)
    } else {
        Ok(std::fs::read_to_string(source)?)
    }
}

fn load_catalog(path: Option<&Path>) -> Result<MemoryQueryEngine, Box<dyn std::error::Error>> {
    match path {
        Some(path) if path.exists() => {
            let raw = std::fs::read(path)?;
            let snapshot: CatalogSnapshot = serde_json::from_slice(&raw)?;
            log::debug!("Loaded {} tables from {}", snapshot.tables.len(), path.display());
            Ok(MemoryQueryEngine::from_snapshot(snapshot))
        }
        _ => Ok(MemoryQueryEngine::new()),
    }
}

fn save_catalog(
    path: &Path,
    snapshot: &CatalogSnapshot,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = serde_json::to_vec_pretty(snapshot)?;
    std::fs::write(path, raw)?;
    Ok(())
}
