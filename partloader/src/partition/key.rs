// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Partition keys derived from object paths
//!
//! The canonical form of a partition is the directory portion of the object
//! key that triggered it, e.g. `data/year=2024/month=01` for
//! `data/year=2024/month=01/file1.csv`. The cache and the catalog must agree
//! on this string for membership checks to work.

use serde::{Deserialize, Serialize};

/// Ordered `(name, value)` pairs plus their canonical path form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    path: String,
    pairs: Vec<(String, String)>,
}

impl PartitionKey {
    /// Build a key from a directory path; a trailing slash is dropped
    pub fn from_dir_path(dir_path: &str) -> Self {
        let path = trim_trailing_slashes(dir_path).to_string();
        let pairs = path
            .split('/')
            .filter_map(|segment| segment.split_once('='))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Self { path, pairs }
    }

    /// Build the key for the directory an object lives in
    pub fn from_object_key(object_key: &str) -> Self {
        Self::from_dir_path(&partition_path(object_key))
    }

    /// Canonical string form
    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// True when the path has no `name=value` segment at all
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn contains_all<S: AsRef<str>>(&self, partition_names: &[S]) -> bool {
        contains_all_partition_keys(&self.path, partition_names)
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Directory portion of an object key, without trailing slashes
///
/// A trailing slash on the key itself is ignored first, so `a/b/` and
/// `a/b` both yield `a`. A key without any `/` has an empty directory.
pub fn partition_path(object_key: &str) -> String {
    let key = trim_trailing_slashes(object_key);
    match key.rfind('/') {
        Some(idx) => trim_trailing_slashes(&key[..idx + 1]).to_string(),
        None => String::new(),
    }
}

/// Whether every partition name occurs somewhere in `dir_path`
///
/// Plain substring containment, independent of order. Used to ignore
/// notifications for prefixes that are not yet a complete partition
/// directory.
pub fn contains_all_partition_keys<S: AsRef<str>>(dir_path: &str, partition_names: &[S]) -> bool {
    partition_names
        .iter()
        .all(|name| dir_path.contains(name.as_ref()))
}

fn trim_trailing_slashes(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && !path.is_empty() {
        // keep a root made only of slashes
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_partition_path() {
        assert_eq!(
            partition_path("data/year=2024/month=01/file1.csv"),
            "data/year=2024/month=01"
        );
        assert_eq!(partition_path("data/_temporary/"), "data");
        assert_eq!(partition_path("file.csv"), "");
        assert_eq!(partition_path("a//b"), "a");
        assert_eq!(partition_path("/file.csv"), "/");
    }

    #[test]
    fn test_pairs_in_path_order() {
        let key = PartitionKey::from_object_key("data/year=2024/month=01/file1.csv");
        assert_eq!(key.as_str(), "data/year=2024/month=01");
        assert_eq!(
            key.pairs(),
            &[
                ("year".to_string(), "2024".to_string()),
                ("month".to_string(), "01".to_string())
            ]
        );
        assert!(!key.is_empty());
    }

    #[test]
    fn test_segments_without_equals_ignored() {
        let key = PartitionKey::from_dir_path("raw/region=eu/batch/day=3/");
        assert_eq!(key.as_str(), "raw/region=eu/batch/day=3");
        assert_eq!(key.pairs().len(), 2);
        assert_eq!(key.pairs()[1], ("day".to_string(), "3".to_string()));
    }

    #[test]
    fn test_value_keeps_extra_equals() {
        let key = PartitionKey::from_dir_path("tag=a=b");
        assert_eq!(key.pairs(), &[("tag".to_string(), "a=b".to_string())]);
    }

    #[test]
    fn test_contains_all_partition_keys() {
        let names = vec!["year".to_string(), "month".to_string()];
        assert!(contains_all_partition_keys("data/year=2024/month=01", &names));
        assert!(contains_all_partition_keys("data/month=01/year=2024", &names));
        assert!(!contains_all_partition_keys("data/year=2024", &names));
        assert!(!contains_all_partition_keys("data", &names));
        let none: [&str; 0] = [];
        assert!(contains_all_partition_keys("anything", &none));
    }

    #[test]
    fn test_equality_is_by_canonical_form() {
        assert_eq!(
            PartitionKey::from_dir_path("d/year=1/"),
            PartitionKey::from_object_key("d/year=1/x.csv")
        );
        assert_ne!(
            PartitionKey::from_dir_path("d/Year=1"),
            PartitionKey::from_dir_path("d/year=1")
        );
    }

    proptest! {
        #[test]
        fn prop_contains_all_matches_every_name(
            dir in "[a-z=/]{0,30}",
            names in prop::collection::vec("[a-z]{1,4}", 0..4),
        ) {
            let expected = names.iter().all(|n| dir.contains(n.as_str()));
            prop_assert_eq!(contains_all_partition_keys(&dir, &names), expected);

            let mut reversed = names.clone();
            reversed.reverse();
            prop_assert_eq!(
                contains_all_partition_keys(&dir, &reversed),
                contains_all_partition_keys(&dir, &names)
            );
        }

        #[test]
        fn prop_partition_path_is_directory_portion(
            dirs in prop::collection::vec("[a-z0-9=]{1,8}", 1..5),
            file in "[a-z0-9.]{1,10}",
            trailing in any::<bool>(),
        ) {
            let dir = dirs.join("/");
            let mut key = format!("{}/{}", dir, file);
            if trailing {
                key.push('/');
            }
            prop_assert_eq!(partition_path(&key), dir);
        }
    }
}
