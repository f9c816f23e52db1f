// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! In-process catalog engine
//!
//! Understands the two statements the reconciler issues, `SHOW PARTITIONS`
//! and `ALTER TABLE ... ADD [IF NOT EXISTS] PARTITION ... LOCATION`, and keeps
//! the registered partitions in memory. `SHOW PARTITIONS` reports each
//! partition by its location path inside the bucket, which is the canonical
//! form the partition cache works with.
//!
//! Failures can be injected at every call so callers' error handling can be
//! exercised: a transport error on submit, a non-200 acknowledgment, a failed
//! status call, a failed result fetch, or a scripted terminal state.

use super::engine::{
    EngineError, QueryEngine, QueryExecutionStatus, QueryState, ResultPage, ResultRow,
    StartQueryRequest, StartQueryResponse,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

static SHOW_PARTITIONS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*SHOW\s+PARTITIONS\s+([`\w.]+)\s*;?\s*$").expect("valid regex")
});

static ADD_PARTITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^\s*ALTER\s+TABLE\s+([`\w.]+)\s+ADD\s+(IF\s+NOT\s+EXISTS\s+)?PARTITION\s*\((.*)\)\s*LOCATION\s+'((?:[^']|'')*)'\s*;?\s*$",
    )
    .expect("valid regex")
});

static PARTITION_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\s*=\s*'((?:[^']|'')*)'").expect("valid regex"));

const DEFAULT_PAGE_SIZE: usize = 1000;

/// Terminal state forced onto the next submitted statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// FAILED with the given reason; the statement is not applied
    Failed(String),
    /// CANCELLED; the statement is not applied
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRecord {
    pub values: Vec<(String, String)>,
    /// Location path inside the bucket, without trailing slash
    pub location: String,
}

/// Registered tables and their partitions, keyed by `database.table`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CatalogSnapshot {
    pub tables: BTreeMap<String, Vec<PartitionRecord>>,
}

struct Execution {
    request: StartQueryRequest,
    state: QueryState,
    reason: Option<String>,
    running_left: u32,
    rows: Vec<ResultRow>,
    status_checks: u32,
}

#[derive(Default)]
struct EngineState {
    catalog: CatalogSnapshot,
    executions: HashMap<String, Execution>,
    submissions: Vec<StartQueryRequest>,
    submit_failures: VecDeque<String>,
    submit_rejections: VecDeque<u16>,
    poll_failures: VecDeque<String>,
    result_failures: VecDeque<String>,
    scripted: VecDeque<ScriptedOutcome>,
}

pub struct MemoryQueryEngine {
    state: Mutex<EngineState>,
    running_polls: u32,
    page_size: usize,
}

impl Default for MemoryQueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueryEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            running_polls: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let engine = Self::new();
        engine.state.lock().catalog = snapshot;
        engine
    }

    /// Report RUNNING for `polls` status checks before the terminal state
    pub fn with_running_polls(mut self, polls: u32) -> Self {
        self.running_polls = polls;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.state.lock().catalog.clone()
    }

    pub fn create_table(&self, database: &str, table: &str) {
        self.state
            .lock()
            .catalog
            .tables
            .entry(qualify(database, table))
            .or_default();
    }

    /// Register a partition directly, as another writer would
    pub fn register_partition(&self, database: &str, table: &str, location: &str) {
        let location = location.trim_end_matches('/').to_string();
        let values = location
            .split('/')
            .filter_map(|segment| segment.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut state = self.state.lock();
        let partitions = state
            .catalog
            .tables
            .entry(qualify(database, table))
            .or_default();
        if !partitions.iter().any(|p| p.location == location) {
            partitions.push(PartitionRecord { values, location });
        }
    }

    /// Partition locations registered for a table, sorted
    pub fn partitions(&self, database: &str, table: &str) -> Vec<String> {
        let state = self.state.lock();
        let mut locations: Vec<String> = state
            .catalog
            .tables
            .get(&qualify(database, table))
            .map(|parts| parts.iter().map(|p| p.location.clone()).collect())
            .unwrap_or_default();
        locations.sort();
        locations
    }

    pub fn submissions(&self) -> Vec<StartQueryRequest> {
        self.state.lock().submissions.clone()
    }

    pub fn submitted_queries(&self) -> Vec<String> {
        self.state
            .lock()
            .submissions
            .iter()
            .map(|r| r.query_string.clone())
            .collect()
    }

    /// Number of answered status checks for an execution
    pub fn status_checks(&self, execution_id: &str) -> u32 {
        self.state
            .lock()
            .executions
            .get(execution_id)
            .map(|e| e.status_checks)
            .unwrap_or(0)
    }

    pub fn fail_next_submit(&self, message: &str) {
        self.state.lock().submit_failures.push_back(message.to_string());
    }

    pub fn reject_next_submit(&self, http_status: u16) {
        self.state.lock().submit_rejections.push_back(http_status);
    }

    pub fn fail_next_poll(&self, message: &str) {
        self.state.lock().poll_failures.push_back(message.to_string());
    }

    pub fn fail_next_results(&self, message: &str) {
        self.state.lock().result_failures.push_back(message.to_string());
    }

    pub fn script_next_outcome(&self, outcome: ScriptedOutcome) {
        self.state.lock().scripted.push_back(outcome);
    }

    /// Submit with a placeholder result location, returning the execution id
    pub fn submit_statement(&self, query: &str, database: &str) -> Result<String, EngineError> {
        let response = self.start_query_execution(StartQueryRequest {
            query_string: query.to_string(),
            database: database.to_string(),
            result_configuration: super::engine::ResultConfiguration {
                output_location: "s3://memory-results".to_string(),
                encryption: Default::default(),
            },
        })?;
        response
            .execution_id
            .ok_or_else(|| EngineError::InvalidRequest(format!("rejected: {}", response.http_status)))
    }

    /// Add an already finished execution holding `rows`
    pub fn insert_completed_execution(&self, query: &str, rows: Vec<ResultRow>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let request = StartQueryRequest {
            query_string: query.to_string(),
            database: String::new(),
            result_configuration: super::engine::ResultConfiguration {
                output_location: "s3://memory-results".to_string(),
                encryption: Default::default(),
            },
        };
        self.state.lock().executions.insert(
            id.clone(),
            Execution {
                request,
                state: QueryState::Succeeded,
                reason: None,
                running_left: 0,
                rows,
                status_checks: 0,
            },
        );
        id
    }

    fn execute(catalog: &mut CatalogSnapshot, query: &str, database: &str) -> Outcome {
        if let Some(caps) = SHOW_PARTITIONS_RE.captures(query) {
            let table = resolve_table(&caps[1], database);
            return match catalog.tables.get(&table) {
                Some(partitions) => {
                    let mut locations: Vec<&str> =
                        partitions.iter().map(|p| p.location.as_str()).collect();
                    locations.sort_unstable();
                    Outcome::succeeded(
                        locations
                            .into_iter()
                            .map(|l| ResultRow::from_values([l]))
                            .collect(),
                    )
                }
                None => Outcome::failed(format!(
                    "SemanticException [Error 10001]: Table not found {}",
                    table
                )),
            };
        }

        if let Some(caps) = ADD_PARTITION_RE.captures(query) {
            let table = resolve_table(&caps[1], database);
            let if_not_exists = caps.get(2).is_some();
            let values: Vec<(String, String)> = PARTITION_PAIR_RE
                .captures_iter(&caps[3])
                .map(|pair| (pair[1].to_string(), unquote(&pair[2])))
                .collect();
            if values.is_empty() {
                return Outcome::failed("InvalidRequestException: empty partition spec".to_string());
            }
            let location = match unquote(&caps[4])
                .strip_prefix("s3://")
                .and_then(|rest| rest.split_once('/'))
            {
                Some((_bucket, path)) => path.trim_end_matches('/').to_string(),
                None => {
                    return Outcome::failed(format!(
                        "InvalidRequestException: bad location {}",
                        &caps[4]
                    ))
                }
            };

            let Some(partitions) = catalog.tables.get_mut(&table) else {
                return Outcome::failed(format!(
                    "SemanticException [Error 10001]: Table not found {}",
                    table
                ));
            };
            if partitions.iter().any(|p| p.values == values) {
                if if_not_exists {
                    return Outcome::succeeded(Vec::new());
                }
                return Outcome::failed(
                    "AlreadyExistsException: Partition already exists.".to_string(),
                );
            }
            partitions.push(PartitionRecord { values, location });
            return Outcome::succeeded(Vec::new());
        }

        Outcome::failed(format!(
            "InvalidRequestException: unsupported statement: {}",
            query
        ))
    }
}

struct Outcome {
    state: QueryState,
    reason: Option<String>,
    rows: Vec<ResultRow>,
}

impl Outcome {
    fn succeeded(rows: Vec<ResultRow>) -> Self {
        Self {
            state: QueryState::Succeeded,
            reason: None,
            rows,
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            state: QueryState::Failed,
            reason: Some(reason),
            rows: Vec::new(),
        }
    }
}

impl QueryEngine for MemoryQueryEngine {
    fn start_query_execution(
        &self,
        request: StartQueryRequest,
    ) -> Result<StartQueryResponse, EngineError> {
        let mut state = self.state.lock();

        if let Some(message) = state.submit_failures.pop_front() {
            return Err(EngineError::Transport(message));
        }
        state.submissions.push(request.clone());
        if let Some(http_status) = state.submit_rejections.pop_front() {
            return Ok(StartQueryResponse {
                http_status,
                execution_id: None,
            });
        }

        let outcome = match state.scripted.pop_front() {
            Some(ScriptedOutcome::Failed(reason)) => Outcome::failed(reason),
            Some(ScriptedOutcome::Cancelled) => Outcome {
                state: QueryState::Cancelled,
                reason: Some("Query cancelled by user".to_string()),
                rows: Vec::new(),
            },
            None => Self::execute(&mut state.catalog, &request.query_string, &request.database),
        };

        let id = uuid::Uuid::new_v4().to_string();
        state.executions.insert(
            id.clone(),
            Execution {
                request,
                state: outcome.state,
                reason: outcome.reason,
                running_left: self.running_polls,
                rows: outcome.rows,
                status_checks: 0,
            },
        );

        Ok(StartQueryResponse {
            http_status: 200,
            execution_id: Some(id),
        })
    }

    fn get_query_execution(
        &self,
        execution_id: &str,
    ) -> Result<QueryExecutionStatus, EngineError> {
        let mut state = self.state.lock();

        if let Some(message) = state.poll_failures.pop_front() {
            return Err(EngineError::Transport(message));
        }
        let execution = state
            .executions
            .get_mut(execution_id)
            .ok_or_else(|| EngineError::UnknownExecution(execution_id.to_string()))?;

        execution.status_checks += 1;
        if execution.running_left > 0 {
            execution.running_left -= 1;
            return Ok(QueryExecutionStatus {
                state: QueryState::Running,
                state_change_reason: None,
            });
        }
        Ok(QueryExecutionStatus {
            state: execution.state,
            state_change_reason: execution.reason.clone(),
        })
    }

    fn get_query_results(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage, EngineError> {
        let mut state = self.state.lock();

        if let Some(message) = state.result_failures.pop_front() {
            return Err(EngineError::Transport(message));
        }
        let execution = state
            .executions
            .get(execution_id)
            .ok_or_else(|| EngineError::UnknownExecution(execution_id.to_string()))?;
        if execution.state != QueryState::Succeeded || execution.running_left > 0 {
            return Err(EngineError::InvalidRequest(format!(
                "query {} ({}) has not succeeded",
                execution_id, execution.request.query_string
            )));
        }

        let offset = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| EngineError::InvalidRequest(format!("bad token {}", token)))?,
            None => 0,
        };
        let end = offset.saturating_add(self.page_size).min(execution.rows.len());
        let rows = execution.rows.get(offset..end).unwrap_or_default().to_vec();

        Ok(ResultPage {
            rows,
            next_token: (end < execution.rows.len()).then(|| end.to_string()),
        })
    }
}

fn qualify(database: &str, table: &str) -> String {
    format!("{}.{}", database, table).to_lowercase()
}

fn resolve_table(identifier: &str, database: &str) -> String {
    let identifier = identifier.replace('`', "");
    match identifier.split_once('.') {
        Some((db, table)) => qualify(db, table),
        None => qualify(database, &identifier),
    }
}

fn unquote(literal: &str) -> String {
    literal.replace("''", "'")
}
