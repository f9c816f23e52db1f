// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Scratch storage types and error handling

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Scratch storage backend selection
///
/// The snapshot only has to survive between invocations that share an
/// execution environment, so every backend is local.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScratchType {
    /// Plain files under a directory, one file per key
    #[default]
    File,

    /// Sled - embedded key-value store
    Sled,

    /// In-memory map, lost at process exit
    Memory,
}

impl std::str::FromStr for ScratchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(ScratchType::File),
            "sled" => Ok(ScratchType::Sled),
            "memory" => Ok(ScratchType::Memory),
            _ => Err(format!(
                "Unknown scratch backend: {}. Valid options: file, sled, memory",
                s
            )),
        }
    }
}

impl std::fmt::Display for ScratchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScratchType::File => "file",
            ScratchType::Sled => "sled",
            ScratchType::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

/// Error type for scratch storage operations
#[derive(Debug)]
pub enum ScratchError {
    /// File system errors
    IoError(std::io::Error),

    /// Value could not be encoded or decoded
    Serialization(String),

    /// Key is empty or escapes the scratch root
    InvalidKey(String),

    /// Backend-specific error (Sled, ...)
    BackendSpecific(String),
}

impl std::fmt::Display for ScratchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScratchError::IoError(e) => write!(f, "I/O error: {}", e),
            ScratchError::Serialization(e) => write!(f, "Serialization error: {}", e),
            ScratchError::InvalidKey(key) => write!(f, "Invalid key: {}", key),
            ScratchError::BackendSpecific(e) => write!(f, "Scratch backend error: {}", e),
        }
    }
}

impl std::error::Error for ScratchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScratchError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScratchError {
    fn from(e: std::io::Error) -> Self {
        ScratchError::IoError(e)
    }
}

impl From<serde_json::Error> for ScratchError {
    fn from(e: serde_json::Error) -> Self {
        ScratchError::Serialization(e.to_string())
    }
}

pub type ScratchResult<T> = Result<T, ScratchError>;

/// Reject keys that are empty or could step outside the scratch root.
pub(crate) fn validate_key(key: &str) -> ScratchResult<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.split('/').any(|segment| segment.is_empty() || segment == "..")
    {
        return Err(ScratchError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_type_parsing() {
        assert_eq!("FILE".parse::<ScratchType>().unwrap(), ScratchType::File);
        assert_eq!(" sled ".parse::<ScratchType>().unwrap(), ScratchType::Sled);
        assert_eq!("memory".parse::<ScratchType>().unwrap(), ScratchType::Memory);
        assert!("rocksdb".parse::<ScratchType>().is_err());
        assert_eq!(ScratchType::default(), ScratchType::File);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("partitions").is_ok());
        assert!(validate_key("lease/data/year=2024/month=01").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("lease/../../escape").is_err());
        assert!(validate_key("double//slash").is_err());
    }
}
