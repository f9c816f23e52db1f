// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Submit, wait and read in one call

use super::client::QueryClient;
use super::engine::QueryEngine;
use super::poller::{Completion, CompletionPoller, PollPolicy};
use super::results::{ResultReader, ResultTuple};
use crate::error::LoaderResult;
use crate::identity::AccountIdentity;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs statements against one database
#[derive(Clone)]
pub struct QueryRunner {
    client: QueryClient,
    poller: CompletionPoller,
    reader: ResultReader,
    database: String,
}

impl QueryRunner {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        identity: &AccountIdentity,
        results_prefix: &str,
        database: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            client: QueryClient::new(engine.clone(), identity, results_prefix),
            poller: CompletionPoller::new(engine.clone(), policy),
            reader: ResultReader::new(engine),
            database: database.into(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.poller = self.poller.with_cancellation(cancel);
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    /// Submit `sql` and wait for its terminal state
    pub fn execute(&self, sql: &str) -> LoaderResult<Completion> {
        let handle = self.client.submit(sql, &self.database)?;
        self.poller.await_completion(&handle)
    }

    /// Submit `sql`, wait for it, and read its rows
    ///
    /// Submission and execution failures are returned; a failure while
    /// reading rows is logged and yields no rows.
    pub fn query_rows(&self, sql: &str, has_header_row: bool) -> LoaderResult<Vec<ResultTuple>> {
        let handle = self.client.submit(sql, &self.database)?;
        self.poller.await_completion(&handle)?;
        Ok(self.reader.read_rows(&handle, has_header_row))
    }
}
