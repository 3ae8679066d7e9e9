// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Action executor.
//!
//! Performs the single [`Action`] chosen for a component: one mutating call against
//! the cluster, owner references on anything created, and a status update that
//! describes the transition just started.

use super::drift::Action;
use crate::cluster::ClusterApi;
use crate::constants::{STATE_PENDING, STATE_STOPPING};
use crate::crd::{Component, DeploymentPhase, WeightsAndBiases, WeightsAndBiasesStatus};
use crate::errors::ClusterError;
use crate::metrics;
use crate::reconcilers::state::{ExitScope, ReconcileState};
use crate::reconcilers::status::{persist_status, status_mut};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use tracing::{error, info};

/// Status change recorded after a successful action.
enum Transition {
    Creating,
    Publishing,
    Deleting,
    Observed { ready: bool, state: String },
}

/// Add the owner's controller reference to `meta`.
///
/// Owner references cannot cross namespaces; an object placed outside the owner's
/// namespace is tracked by its labels only.
fn owned_by(owner: &WeightsAndBiases, meta: &mut ObjectMeta) {
    if meta.namespace.is_none() || meta.namespace != owner.namespace() {
        return;
    }
    if let Some(reference) = owner.controller_owner_ref(&()) {
        let references = meta.owner_references.get_or_insert_with(Vec::new);
        if !references.iter().any(|r| r.uid == reference.uid) {
            references.push(reference);
        }
    }
}

/// Record the global phase unless deletion is paused, which only backups clear.
fn set_phase(status: &mut WeightsAndBiasesStatus, phase: DeploymentPhase, message: String) {
    if status.state != DeploymentPhase::DeletionPaused {
        status.state = phase;
        status.message = message;
    }
}

async fn apply(
    cluster: &dyn ClusterApi,
    owner: &WeightsAndBiases,
    action: Action,
) -> Result<Transition, ClusterError> {
    match action {
        Action::CreateDependent { key, mut object } | Action::CreatePrimary { key, mut object } => {
            owned_by(owner, &mut object.metadata);
            cluster.create_object(&key, &object).await?;
            Ok(Transition::Creating)
        }
        Action::CreateSecret { mut secret } => {
            owned_by(owner, &mut secret.metadata);
            let namespace = secret.namespace().unwrap_or_default();
            cluster.create_secret(&namespace, &secret).await?;
            Ok(Transition::Publishing)
        }
        Action::DeleteDependent { key } | Action::DeletePrimary { key } => {
            cluster.delete_object(&key).await?;
            Ok(Transition::Deleting)
        }
        Action::DeleteSecret { namespace, name } => {
            cluster.delete_secret(&namespace, &name).await?;
            Ok(Transition::Deleting)
        }
        Action::UpdateStatus { observed } => Ok(Transition::Observed {
            ready: observed.ready,
            state: observed.state,
        }),
    }
}

/// Execute `action` for `component` and record the transition in `owner`'s status.
///
/// # Returns
///
/// `done(Component)` once the action is applied, so the pass moves on to the next
/// component, or `fail` carrying the cluster error.
pub async fn execute(
    cluster: &dyn ClusterApi,
    owner: &mut WeightsAndBiases,
    component: Component,
    action: Action,
) -> ReconcileState {
    let name = action.name();
    let target = match &action {
        Action::CreateDependent { key, .. }
        | Action::CreatePrimary { key, .. }
        | Action::DeleteDependent { key }
        | Action::DeletePrimary { key } => format!("{} {}/{}", key.kind(), key.namespace, key.name),
        Action::DeleteSecret { namespace, name } => format!("Secret {namespace}/{name}"),
        Action::CreateSecret { secret } => format!(
            "Secret {}/{}",
            secret.namespace().unwrap_or_default(),
            secret.name_any()
        ),
        Action::UpdateStatus { .. } => "status".to_string(),
    };
    info!(component = %component, action = name, "Executing {} on {}", name, target);

    let transition = match apply(cluster, owner, action).await {
        Ok(transition) => {
            metrics::record_action(component.key(), name, true);
            transition
        }
        Err(e) => {
            error!(component = %component, action = name, "Failed to {} {}: {}", name, target, e);
            metrics::record_action(component.key(), name, false);
            return ReconcileState::fail(e);
        }
    };

    let flagged = owner.metadata.deletion_timestamp.is_some();
    let status = status_mut(owner);
    let phase = if flagged {
        DeploymentPhase::Deleting
    } else {
        DeploymentPhase::InfraUpdate
    };
    match transition {
        Transition::Creating => {
            set_phase(status, phase, format!("Creating {component}"));
            let entry = status.component_mut(component);
            entry.ready = false;
            entry.state = STATE_PENDING.to_string();
        }
        Transition::Publishing => {
            set_phase(status, phase, format!("Publishing {component} connection details"));
        }
        Transition::Deleting => {
            set_phase(status, phase, format!("Deleting {component}"));
            let entry = status.component_mut(component);
            entry.ready = false;
            entry.state = STATE_STOPPING.to_string();
        }
        Transition::Observed { ready, state } => {
            let entry = status.component_mut(component);
            entry.ready = ready;
            entry.state = state;
        }
    }

    persist_status(cluster, owner).await;
    ReconcileState::done(ExitScope::Component)
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod executor_tests;
