// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Query submission

use super::engine::{
    EncryptionOption, QueryEngine, ResultConfiguration, StartQueryRequest,
};
use crate::error::{LoaderError, LoaderResult};
use crate::identity::AccountIdentity;
use std::sync::Arc;

const ACCEPTED_STATUS: u16 = 200;

/// A submitted query, valid until its outcome has been consumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryHandle {
    execution_id: String,
    query: String,
}

impl QueryHandle {
    pub fn new(execution_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            query: query.into(),
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Submits statements to the catalog engine
///
/// A returned error means the state of the statement is unknown; callers must
/// not assume it took effect.
#[derive(Clone)]
pub struct QueryClient {
    engine: Arc<dyn QueryEngine>,
    output_location: String,
}

impl QueryClient {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        identity: &AccountIdentity,
        results_prefix: &str,
    ) -> Self {
        Self {
            engine,
            output_location: identity.output_location(results_prefix),
        }
    }

    pub fn output_location(&self) -> &str {
        &self.output_location
    }

    pub fn submit(&self, query: &str, database: &str) -> LoaderResult<QueryHandle> {
        let request = StartQueryRequest {
            query_string: query.to_string(),
            database: database.to_string(),
            result_configuration: ResultConfiguration {
                output_location: self.output_location.clone(),
                encryption: EncryptionOption::SseS3,
            },
        };

        let response = self.engine.start_query_execution(request).map_err(|e| {
            log::error!("Error submitting query {} ({})", query, e);
            LoaderError::Submission(e.to_string())
        })?;

        if response.http_status != ACCEPTED_STATUS {
            log::error!(
                "Query submission returned status {} for {}",
                response.http_status,
                query
            );
            return Err(LoaderError::Submission(format!(
                "unexpected response status {}",
                response.http_status
            )));
        }

        match response.execution_id {
            Some(execution_id) => {
                log::info!("Query {} submitted: {}", execution_id, query);
                Ok(QueryHandle::new(execution_id, query))
            }
            None => {
                log::error!("Query submission for {} returned no execution id", query);
                Err(LoaderError::Submission(
                    "acknowledgment carried no execution id".to_string(),
                ))
            }
        }
    }
}
