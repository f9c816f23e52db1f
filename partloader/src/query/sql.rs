// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog statements issued by the reconciler

use crate::error::{LoaderError, LoaderResult};
use crate::partition::PartitionKey;

pub fn show_partitions(table: &str) -> String {
    format!("SHOW PARTITIONS {}", table)
}

/// `ALTER TABLE <table> ADD PARTITION (k1 = 'v1', ...) LOCATION 's3://<bucket>/<path>'`
///
/// Pairs appear in path order. Single quotes inside values are doubled.
pub fn add_partition(table: &str, partition: &PartitionKey, bucket: &str) -> LoaderResult<String> {
    if partition.is_empty() {
        return Err(LoaderError::InvalidEvent(format!(
            "{} has no name=value segments",
            partition
        )));
    }

    let spec = partition
        .pairs()
        .iter()
        .map(|(name, value)| format!("{} = '{}'", name, quote_literal(value)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "ALTER TABLE {} ADD PARTITION ({}) LOCATION 's3://{}/{}'",
        table,
        spec,
        bucket,
        quote_literal(partition.as_str())
    ))
}

fn quote_literal(value: &str) -> String {
    value.replace('\'', "''")
}
