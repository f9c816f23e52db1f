// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Account identity used to derive the query result location
//!
//! The account id cannot change within a process, so it is resolved once and
//! then passed around as an immutable [`AccountIdentity`] value.

use crate::error::{LoaderError, LoaderResult};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Looks up the account the process is running as (an STS-style caller
/// identity call in production).
pub trait IdentityResolver: Send + Sync {
    fn account_id(&self) -> LoaderResult<String>;
}

/// Resolver returning a fixed account id
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    account_id: String,
}

impl StaticIdentity {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
        }
    }
}

impl IdentityResolver for StaticIdentity {
    fn account_id(&self) -> LoaderResult<String> {
        Ok(self.account_id.clone())
    }
}

/// Memoizes another resolver so the lookup happens at most once
///
/// A failed lookup is not cached; the next call tries again.
pub struct CachedIdentityResolver<R: IdentityResolver> {
    inner: R,
    cell: OnceCell<String>,
}

impl<R: IdentityResolver> CachedIdentityResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cell: OnceCell::new(),
        }
    }
}

impl<R: IdentityResolver> IdentityResolver for CachedIdentityResolver<R> {
    fn account_id(&self) -> LoaderResult<String> {
        self.cell
            .get_or_try_init(|| {
                log::debug!("Resolving account identity");
                self.inner.account_id()
            })
            .cloned()
    }
}

/// Account and region the catalog queries run under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    account_id: String,
    region: String,
}

impl AccountIdentity {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> LoaderResult<Self> {
        let account_id = account_id.into();
        let region = region.into();
        if account_id.trim().is_empty() {
            return Err(LoaderError::Config("account id is empty".to_string()));
        }
        if region.trim().is_empty() {
            return Err(LoaderError::Config("region is empty".to_string()));
        }
        Ok(Self { account_id, region })
    }

    /// Resolve the account id through `resolver` and pair it with `region`
    pub fn resolve(resolver: &dyn IdentityResolver, region: &str) -> LoaderResult<Self> {
        Self::new(resolver.account_id()?, region)
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Query result location: `<prefix>-<account>-<region>`
    pub fn output_location(&self, results_prefix: &str) -> String {
        format!(
            "{}-{}-{}",
            results_prefix.trim_end_matches('/'),
            self.account_id,
            self.region
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl IdentityResolver for CountingResolver {
        fn account_id(&self) -> LoaderResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("123456789012".to_string())
        }
    }

    #[test]
    fn test_output_location() {
        let identity = AccountIdentity::new("123456789012", "us-east-1").unwrap();
        assert_eq!(
            identity.output_location("s3://aws-athena-query-results"),
            "s3://aws-athena-query-results-123456789012-us-east-1"
        );
    }

    #[test]
    fn test_cached_resolver_resolves_once() {
        let resolver = CachedIdentityResolver::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });

        let first = AccountIdentity::resolve(&resolver, "eu-west-1").unwrap();
        let second = AccountIdentity::resolve(&resolver, "eu-west-1").unwrap();

        assert_eq!(first, second);
        assert_eq!(resolver.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_account_rejected() {
        let resolver = StaticIdentity::new("  ");
        assert!(matches!(
            AccountIdentity::resolve(&resolver, "us-east-1"),
            Err(LoaderError::Config(_))
        ));
    }
}
