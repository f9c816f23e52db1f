// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for partition reconciliation

use crate::scratch::ScratchError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoaderError {
    /// The catalog rejected the query or the submission call itself failed.
    #[error("Query submission failed: {0}")]
    Submission(String),

    #[error("Query {execution_id} failed: {reason}")]
    ExecutionFailed {
        execution_id: String,
        reason: String,
    },

    #[error("Query {0} was cancelled")]
    ExecutionCancelled(String),

    #[error("Polling query status failed: {0}")]
    Polling(String),

    #[error("Fetching query results failed: {0}")]
    ResultFetch(String),

    #[error("Query {execution_id} did not finish after {attempts} status checks")]
    Timeout { execution_id: String, attempts: u32 },

    /// The caller's cancellation token fired while waiting on a query.
    #[error("Wait for query {0} was cancelled by the caller")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid storage event: {0}")]
    InvalidEvent(String),

    #[error("Scratch storage error: {0}")]
    Scratch(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unexpected result row: {0}")]
    UnexpectedRow(String),
}

impl LoaderError {
    /// True for errors produced while talking to the catalog engine.
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            LoaderError::Submission(_)
                | LoaderError::ExecutionFailed { .. }
                | LoaderError::ExecutionCancelled(_)
                | LoaderError::Polling(_)
                | LoaderError::ResultFetch(_)
                | LoaderError::Timeout { .. }
                | LoaderError::Cancelled(_)
        )
    }
}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        LoaderError::Scratch(err.to_string())
    }
}

impl From<serde_json::Error> for LoaderError {
    fn from(err: serde_json::Error) -> Self {
        LoaderError::Serialization(err.to_string())
    }
}

impl From<ScratchError> for LoaderError {
    fn from(err: ScratchError) -> Self {
        match err {
            ScratchError::Serialization(msg) => LoaderError::Serialization(msg),
            other => LoaderError::Scratch(other.to_string()),
        }
    }
}

pub type LoaderResult<T> = Result<T, LoaderError>;
