// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Invocation entry point
//!
//! Wires configuration, identity, the query engine and scratch storage into a
//! [`PartitionReconciler`] and turns one storage notification into the status
//! token returned to the invoking platform.

use crate::config::{LoaderConfig, StatusMode};
use crate::error::LoaderResult;
use crate::event::StorageEvent;
use crate::identity::AccountIdentity;
use crate::query::{QueryEngine, QueryRunner};
use crate::reconciler::{PartitionReconciler, ReconcileOutcome};
use crate::scratch::{create_scratch_store, ScratchStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Status token reported for a completed invocation
pub const SUCCESS_STATUS: &str = "Success";

pub struct PartitionHandler {
    config: LoaderConfig,
    reconciler: PartitionReconciler,
    scratch: Arc<dyn ScratchStore>,
}

impl PartitionHandler {
    pub fn new(
        config: LoaderConfig,
        engine: Arc<dyn QueryEngine>,
        identity: AccountIdentity,
        scratch: Arc<dyn ScratchStore>,
    ) -> LoaderResult<Self> {
        if identity.region() != config.region {
            log::warn!(
                "Identity region {} differs from configured region {}",
                identity.region(),
                config.region
            );
        }
        let runner = QueryRunner::new(
            engine,
            &identity,
            &config.results_prefix,
            config.database.clone(),
            config.poll.clone(),
        );
        let reconciler = PartitionReconciler::new(&config, runner, scratch.clone())?;
        Ok(Self {
            config,
            reconciler,
            scratch,
        })
    }

    /// Handler whose scratch store is chosen by `config.scratch_backend`
    pub fn from_config(
        config: LoaderConfig,
        engine: Arc<dyn QueryEngine>,
        identity: AccountIdentity,
    ) -> LoaderResult<Self> {
        let scratch: Arc<dyn ScratchStore> =
            Arc::from(create_scratch_store(config.scratch_backend, config.cache_dir())?);
        Self::new(config, engine, identity, scratch)
    }

    /// Stop waiting on executions once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.reconciler = self.reconciler.with_cancellation(cancel);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn reconciler(&self) -> &PartitionReconciler {
        &self.reconciler
    }

    pub fn scratch(&self) -> &Arc<dyn ScratchStore> {
        &self.scratch
    }

    /// Handle a raw JSON notification payload
    pub fn handle_payload(&self, payload: &str) -> LoaderResult<&'static str> {
        let result = StorageEvent::from_json(payload).and_then(|event| self.reconcile_event(&event));
        self.status_for(result)
    }

    pub fn handle_event(&self, event: &StorageEvent) -> LoaderResult<&'static str> {
        let result = self.reconcile_event(event);
        self.status_for(result)
    }

    /// Reconcile the event's object and report what happened
    pub fn reconcile_event(&self, event: &StorageEvent) -> LoaderResult<ReconcileOutcome> {
        let object = event.first_object()?;
        let outcome = self.reconciler.reconcile(&object)?;
        log::info!("{}", outcome);
        Ok(outcome)
    }

    /// Status token for a reconciliation result under the configured status mode
    pub fn status_for(
        &self,
        result: LoaderResult<ReconcileOutcome>,
    ) -> LoaderResult<&'static str> {
        match result {
            Ok(_) => Ok(SUCCESS_STATUS),
            Err(e) => match self.config.status_mode {
                StatusMode::Strict => Err(e),
                StatusMode::AlwaysSuccess => {
                    log::error!("Invocation failed, reporting success anyway: {}", e);
                    Ok(SUCCESS_STATUS)
                }
            },
        }
    }
}

impl std::fmt::Debug for PartitionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionHandler")
            .field("table", &self.config.table)
            .field("database", &self.config.database)
            .field("status_mode", &self.config.status_mode)
            .finish()
    }
}
