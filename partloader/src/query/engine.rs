// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog query engine interface
//!
//! The catalog exposes an asynchronous SQL service: a statement is submitted
//! and acknowledged with an execution id, its state is polled until it is
//! terminal, and tabular results are paged out afterwards. Every call here is
//! a blocking round trip.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Execution state reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryState::Succeeded | QueryState::Failed | QueryState::Cancelled
        )
    }
}

impl std::fmt::Display for QueryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QueryState::Queued => "QUEUED",
            QueryState::Running => "RUNNING",
            QueryState::Succeeded => "SUCCEEDED",
            QueryState::Failed => "FAILED",
            QueryState::Cancelled => "CANCELLED",
        };
        write!(f, "{}", name)
    }
}

/// Server-side encryption applied to the query result objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EncryptionOption {
    #[default]
    #[serde(rename = "SSE_S3")]
    SseS3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultConfiguration {
    pub output_location: String,
    pub encryption: EncryptionOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartQueryRequest {
    pub query_string: String,
    pub database: String,
    pub result_configuration: ResultConfiguration,
}

/// Acknowledgment of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartQueryResponse {
    /// Transport status of the acknowledgment; only 200 means accepted
    pub http_status: u16,
    pub execution_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExecutionStatus {
    pub state: QueryState,
    pub state_change_reason: Option<String>,
}

/// One cell of a result row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Datum {
    pub var_char_value: Option<String>,
}

impl Datum {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            var_char_value: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResultRow {
    pub data: Vec<Datum>,
}

impl ResultRow {
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data: values.into_iter().map(Datum::new).collect(),
        }
    }
}

/// A page of results; `next_token` is set while more pages remain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResultPage {
    pub rows: Vec<ResultRow>,
    pub next_token: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown query execution: {0}")]
    UnknownExecution(String),
}

pub trait QueryEngine: Send + Sync {
    /// Submit a statement for asynchronous execution
    fn start_query_execution(
        &self,
        request: StartQueryRequest,
    ) -> Result<StartQueryResponse, EngineError>;

    /// Current state of a submitted execution
    fn get_query_execution(&self, execution_id: &str)
        -> Result<QueryExecutionStatus, EngineError>;

    /// One page of results for a finished execution
    fn get_query_results(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage, EngineError>;
}

impl<E: QueryEngine + ?Sized> QueryEngine for Arc<E> {
    fn start_query_execution(
        &self,
        request: StartQueryRequest,
    ) -> Result<StartQueryResponse, EngineError> {
        (**self).start_query_execution(request)
    }

    fn get_query_execution(
        &self,
        execution_id: &str,
    ) -> Result<QueryExecutionStatus, EngineError> {
        (**self).get_query_execution(execution_id)
    }

    fn get_query_results(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage, EngineError> {
        (**self).get_query_results(execution_id, next_token)
    }
}
