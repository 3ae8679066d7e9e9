// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `WeightsAndBiases` reconciliation logic.
//!
//! One pass runs every component pipeline in order (MySQL, Redis, Kafka, MinIO,
//! ClickHouse), then derives the global phase and `Ready` condition from the
//! per-component results and writes status if anything changed.
//!
//! A component that made a change or is waiting ends only its own part of the pass;
//! a failure ends the whole pass and the controller retries it with backoff.

use crate::cluster::ClusterApi;
use crate::crd::{DeploymentPhase, WeightsAndBiases, WeightsAndBiasesStatus};
use crate::reconcilers::component::reconcile_component;
use crate::reconcilers::kinds;
use crate::reconcilers::state::{ExitScope, ReconcileState};
use crate::reconcilers::status::{
    condition_changed, find_condition, infer_phase, persist_status, refresh_ready_condition,
};
use crate::status_reasons::CONDITION_TYPE_READY;
use kube::ResourceExt;
use tracing::{debug, info, warn};

/// Message recorded alongside a phase the pass itself settled on.
fn phase_message(phase: DeploymentPhase) -> Option<&'static str> {
    match phase {
        DeploymentPhase::Ready => Some("All enabled components are ready"),
        DeploymentPhase::Pending => Some("Waiting for components to become ready"),
        _ => None,
    }
}

/// Reconcile a `WeightsAndBiases` resource.
///
/// `owner` is updated in place with every write the pass makes, including status.
///
/// # Returns
///
/// The combined state of every component pass. Convert it with
/// [`ReconcileState::to_result`] to get the requeue hint or the error that ended the
/// pass.
pub async fn reconcile_wandb(cluster: &dyn ClusterApi, owner: &mut WeightsAndBiases) -> ReconcileState {
    let namespace = owner.namespace().unwrap_or_default();
    let name = owner.name_any();
    info!("Reconciling WeightsAndBiases: {}/{}", namespace, name);

    let started = owner.status.clone();
    let mut state = ReconcileState::none();

    for kind in kinds::all() {
        let outcome = reconcile_component(cluster, owner, kind).await;
        state = state.combine(outcome);
        if state.should_exit(ExitScope::Reconciler) {
            warn!(
                "Reconciliation of {}/{} stopped at {}: {}",
                namespace,
                name,
                kind.component(),
                state
                    .error()
                    .map_or_else(|| "no error".to_string(), ToString::to_string)
            );
            return state;
        }
    }

    let flagged = owner.metadata.deletion_timestamp.is_some();
    let generation = owner.metadata.generation;
    let status = owner
        .status
        .get_or_insert_with(WeightsAndBiasesStatus::default);

    let phase = infer_phase(&owner.spec, status, flagged);
    if phase != status.state {
        info!(
            "WeightsAndBiases {}/{} phase {} -> {}",
            namespace, name, status.state, phase
        );
        status.state = phase;
        if let Some(message) = phase_message(phase) {
            status.message = message.to_string();
        }
    }
    status.observed_generation = generation;

    let previous = find_condition(&status.conditions, CONDITION_TYPE_READY).cloned();
    refresh_ready_condition(&owner.spec, status);
    if let Some(current) = find_condition(&status.conditions, CONDITION_TYPE_READY) {
        if condition_changed(previous.as_ref(), current) {
            info!(
                "WeightsAndBiases {}/{} Ready={}: {}",
                namespace,
                name,
                current.status,
                current.message.as_deref().unwrap_or_default()
            );
        }
    }

    if owner.status != started {
        persist_status(cluster, owner).await;
    } else {
        debug!("Status of {}/{} unchanged", namespace, name);
    }

    state
}

#[cfg(test)]
#[path = "wandb_tests.rs"]
mod wandb_tests;
