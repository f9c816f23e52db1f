// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Loader configuration
//!
//! Everything is supplied through environment-style key/value pairs before the
//! invocation starts. Required keys:
//!
//! | Key | Meaning |
//! |---|---|
//! | `ATHENA_REGION` | region the catalog runs in |
//! | `ATHENA_DATABASE` | target database |
//! | `ATHENA_TABLE` | target table |
//! | `PARTITION_KEYS` | comma separated, ordered partition key names |
//!
//! Optional keys are listed on [`LoaderConfig::from_lookup`].

use crate::error::{LoaderError, LoaderResult};
use crate::query::poller::{Backoff, PollPolicy};
use crate::scratch::ScratchType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_REGION: &str = "ATHENA_REGION";
pub const ENV_DATABASE: &str = "ATHENA_DATABASE";
pub const ENV_TABLE: &str = "ATHENA_TABLE";
pub const ENV_PARTITION_KEYS: &str = "PARTITION_KEYS";
pub const ENV_CACHE_FILE: &str = "PARTITION_CACHE_FILE";
pub const ENV_CACHE_BACKEND: &str = "PARTITION_CACHE_BACKEND";
pub const ENV_RESULTS_PREFIX: &str = "ATHENA_RESULTS_PREFIX";
pub const ENV_POLL_INTERVAL_MS: &str = "POLL_INTERVAL_MS";
pub const ENV_POLL_MAX_ATTEMPTS: &str = "POLL_MAX_ATTEMPTS";
pub const ENV_POLL_BACKOFF: &str = "POLL_BACKOFF";
pub const ENV_LEASE_TTL_SECS: &str = "PARTITION_LEASE_TTL_SECS";
pub const ENV_STATUS_MODE: &str = "INVOCATION_STATUS_MODE";

pub const DEFAULT_CACHE_FILE: &str = "/tmp/partitions";
pub const DEFAULT_RESULTS_PREFIX: &str = "s3://aws-athena-query-results";

/// What the invocation boundary reports when reconciliation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusMode {
    /// Hard failures are returned as errors
    #[default]
    Strict,
    /// Every invocation reports `Success`; failures are only logged
    AlwaysSuccess,
}

impl std::str::FromStr for StatusMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(StatusMode::Strict),
            "always_success" | "legacy" => Ok(StatusMode::AlwaysSuccess),
            _ => Err(format!(
                "Unknown status mode: {}. Valid options: strict, always_success",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoaderConfig {
    /// Region the catalog query engine runs in
    pub region: String,

    /// Database the table lives in
    pub database: String,

    /// Table whose partitions are managed
    pub table: String,

    /// Ordered partition key names, e.g. `["year", "month"]`
    pub partition_keys: Vec<String>,

    /// Location of the cache snapshot
    pub cache_file: PathBuf,

    pub scratch_backend: ScratchType,

    /// Prefix of the query result bucket; account and region are appended
    pub results_prefix: String,

    pub poll: PollPolicy,

    /// Lease lifetime; `None` disables partition leases
    pub lease_ttl: Option<Duration>,

    pub status_mode: StatusMode,
}

impl LoaderConfig {
    /// Minimal configuration with defaults for every optional setting
    pub fn new(
        region: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
        partition_keys: Vec<String>,
    ) -> Self {
        Self {
            region: region.into(),
            database: database.into(),
            table: table.into(),
            partition_keys,
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            scratch_backend: ScratchType::default(),
            results_prefix: DEFAULT_RESULTS_PREFIX.to_string(),
            poll: PollPolicy::default(),
            lease_ttl: None,
            status_mode: StatusMode::default(),
        }
    }

    /// Read configuration from the process environment
    pub fn from_env() -> LoaderResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    ///
    /// Optional keys: `PARTITION_CACHE_FILE`, `PARTITION_CACHE_BACKEND`,
    /// `ATHENA_RESULTS_PREFIX`, `POLL_INTERVAL_MS`, `POLL_MAX_ATTEMPTS`
    /// (`0` waits forever), `POLL_BACKOFF` (`fixed` | `exponential`),
    /// `PARTITION_LEASE_TTL_SECS`, `INVOCATION_STATUS_MODE`.
    pub fn from_lookup<F>(lookup: F) -> LoaderResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> LoaderResult<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| LoaderError::Config(format!("{} is not set", key)))
        };

        let mut config = Self::new(
            required(ENV_REGION)?,
            required(ENV_DATABASE)?,
            required(ENV_TABLE)?,
            parse_partition_keys(&required(ENV_PARTITION_KEYS)?),
        );

        if let Some(path) = lookup(ENV_CACHE_FILE) {
            config.cache_file = PathBuf::from(path.trim());
        }
        if let Some(backend) = lookup(ENV_CACHE_BACKEND) {
            config.scratch_backend = backend.parse().map_err(LoaderError::Config)?;
        }
        if let Some(prefix) = lookup(ENV_RESULTS_PREFIX) {
            config.results_prefix = prefix.trim().to_string();
        }
        if let Some(ms) = lookup(ENV_POLL_INTERVAL_MS) {
            config.poll.interval = Duration::from_millis(parse_number(ENV_POLL_INTERVAL_MS, &ms)?);
        }
        if let Some(attempts) = lookup(ENV_POLL_MAX_ATTEMPTS) {
            let attempts = parse_number(ENV_POLL_MAX_ATTEMPTS, &attempts)?;
            config.poll.max_attempts = match attempts {
                0 => None,
                n => Some(u32::try_from(n).map_err(|_| {
                    LoaderError::Config(format!("{} is too large: {}", ENV_POLL_MAX_ATTEMPTS, n))
                })?),
            };
        }
        if let Some(backoff) = lookup(ENV_POLL_BACKOFF) {
            config.poll.backoff = backoff.parse().map_err(LoaderError::Config)?;
        }
        if let Some(ttl) = lookup(ENV_LEASE_TTL_SECS) {
            config.lease_ttl = match parse_number(ENV_LEASE_TTL_SECS, &ttl)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            };
        }
        if let Some(mode) = lookup(ENV_STATUS_MODE) {
            config.status_mode = mode.parse().map_err(LoaderError::Config)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LoaderResult<()> {
        if self.partition_keys.is_empty() {
            return Err(LoaderError::Config(format!(
                "{} must name at least one partition key",
                ENV_PARTITION_KEYS
            )));
        }
        if self.table.chars().any(char::is_whitespace) {
            return Err(LoaderError::Config(format!(
                "table name contains whitespace: {:?}",
                self.table
            )));
        }
        if self.cache_key().is_none() {
            return Err(LoaderError::Config(format!(
                "cache file has no file name: {}",
                self.cache_file.display()
            )));
        }
        if self.poll.interval.is_zero() && self.poll.backoff == Backoff::Exponential {
            return Err(LoaderError::Config(
                "exponential backoff needs a non-zero poll interval".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory holding the scratch store
    pub fn cache_dir(&self) -> &Path {
        self.cache_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    /// Scratch key the snapshot is stored under
    pub fn cache_key(&self) -> Option<String> {
        self.cache_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

fn parse_partition_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

fn parse_number(key: &str, raw: &str) -> LoaderResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| LoaderError::Config(format!("{} must be a number ({}): {:?}", key, e, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_REGION, "us-east-1"),
            (ENV_DATABASE, "analytics"),
            (ENV_TABLE, "events"),
            (ENV_PARTITION_KEYS, "year, month,,"),
        ]
    }

    #[test]
    fn test_required_keys_and_defaults() {
        let config = LoaderConfig::from_lookup(lookup_from(&required())).unwrap();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.database, "analytics");
        assert_eq!(config.table, "events");
        assert_eq!(config.partition_keys, vec!["year", "month"]);
        assert_eq!(config.cache_file, PathBuf::from("/tmp/partitions"));
        assert_eq!(config.cache_dir(), Path::new("/tmp"));
        assert_eq!(config.cache_key().as_deref(), Some("partitions"));
        assert_eq!(config.scratch_backend, ScratchType::File);
        assert_eq!(config.poll, PollPolicy::default());
        assert_eq!(config.lease_ttl, None);
        assert_eq!(config.status_mode, StatusMode::Strict);
    }

    #[test]
    fn test_missing_required_key() {
        let pairs: Vec<_> = required()
            .into_iter()
            .filter(|(k, _)| *k != ENV_TABLE)
            .collect();
        let err = LoaderConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert_eq!(err, LoaderError::Config("ATHENA_TABLE is not set".to_string()));
    }

    #[test]
    fn test_empty_partition_keys_rejected() {
        let mut pairs = required();
        pairs.retain(|(k, _)| *k != ENV_PARTITION_KEYS);
        pairs.push((ENV_PARTITION_KEYS, " , "));
        assert!(matches!(
            LoaderConfig::from_lookup(lookup_from(&pairs)),
            Err(LoaderError::Config(_))
        ));
    }

    #[test]
    fn test_optional_overrides() {
        let mut pairs = required();
        pairs.extend([
            (ENV_CACHE_FILE, "/var/cache/parts.json"),
            (ENV_CACHE_BACKEND, "memory"),
            (ENV_POLL_INTERVAL_MS, "250"),
            (ENV_POLL_MAX_ATTEMPTS, "0"),
            (ENV_POLL_BACKOFF, "exponential"),
            (ENV_LEASE_TTL_SECS, "30"),
            (ENV_STATUS_MODE, "always_success"),
        ]);
        let config = LoaderConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.cache_dir(), Path::new("/var/cache"));
        assert_eq!(config.cache_key().as_deref(), Some("parts.json"));
        assert_eq!(config.scratch_backend, ScratchType::Memory);
        assert_eq!(config.poll.interval, Duration::from_millis(250));
        assert_eq!(config.poll.max_attempts, None);
        assert_eq!(config.poll.backoff, Backoff::Exponential);
        assert_eq!(config.lease_ttl, Some(Duration::from_secs(30)));
        assert_eq!(config.status_mode, StatusMode::AlwaysSuccess);
    }

    #[test]
    fn test_invalid_number() {
        let mut pairs = required();
        pairs.push((ENV_POLL_INTERVAL_MS, "soon"));
        assert!(matches!(
            LoaderConfig::from_lookup(lookup_from(&pairs)),
            Err(LoaderError::Config(_))
        ));
    }

    #[test]
    fn test_relative_cache_file() {
        let mut config = LoaderConfig::new("r", "d", "t", vec!["year".into()]);
        config.cache_file = PathBuf::from("partitions");
        assert_eq!(config.cache_dir(), Path::new("."));
        assert!(config.validate().is_ok());
    }
}
