// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Storage-write notifications
//!
//! Payload shape (only the fields used here):
//!
//! ```json
//! {"Records": [{"s3": {"bucket": {"name": "my-bucket"},
//!                      "object": {"key": "data/year%3D2024/file.csv", "size": 1024}}}]}
//! ```
//!
//! Only the first record is processed.

use crate::error::{LoaderError, LoaderResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub s3: StorageEntity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Percent-encoded object key
    pub key: String,
    #[serde(default)]
    pub size: u64,
}

/// The created object an invocation works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCreated {
    pub bucket: String,
    /// Decoded key without trailing slash
    pub key: String,
    pub size: u64,
}

impl StorageEvent {
    pub fn from_json(payload: &str) -> LoaderResult<Self> {
        serde_json::from_str(payload)
            .map_err(|e| LoaderError::InvalidEvent(format!("malformed payload: {}", e)))
    }

    /// Event for a single object, as the storage service would send it
    pub fn object_created(bucket: &str, encoded_key: &str, size: u64) -> Self {
        Self {
            records: vec![EventRecord {
                s3: StorageEntity {
                    bucket: BucketRef {
                        name: bucket.to_string(),
                    },
                    object: ObjectRef {
                        key: encoded_key.to_string(),
                        size,
                    },
                },
            }],
        }
    }

    pub fn first_object(&self) -> LoaderResult<ObjectCreated> {
        let record = self
            .records
            .first()
            .ok_or_else(|| LoaderError::InvalidEvent("event has no records".to_string()))?;
        if self.records.len() > 1 {
            log::warn!(
                "Event carries {} records, only the first is processed",
                self.records.len()
            );
        }

        let bucket = record.s3.bucket.name.trim();
        if bucket.is_empty() {
            return Err(LoaderError::InvalidEvent("bucket name is empty".to_string()));
        }

        let key = decode_object_key(&record.s3.object.key)
            .trim_end_matches('/')
            .to_string();
        if key.is_empty() {
            return Err(LoaderError::InvalidEvent("object key is empty".to_string()));
        }

        Ok(ObjectCreated {
            bucket: bucket.to_string(),
            key,
            size: record.s3.object.size,
        })
    }
}

/// Decode a form-encoded object key: `+` is a space and `%XX` is a byte.
/// Malformed escapes are kept as-is; invalid UTF-8 is replaced.
pub fn decode_object_key(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        decoded.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        decoded.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                decoded.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
