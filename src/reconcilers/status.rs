// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status projection for `WeightsAndBiases` resources.
//!
//! This module maps what a component's live objects report into the
//! per-component status block, infers the global phase from all components, and
//! maintains the encompassing `Ready` condition.
//!
//! # Condition Format
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (e.g., "Ready")
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the condition changed

use crate::cluster::ClusterApi;
use crate::crd::{
    Component, ComponentStatus, Condition, DeploymentPhase, WeightsAndBiases,
    WeightsAndBiasesSpec, WeightsAndBiasesStatus,
};
use crate::errors::ClusterError;
use crate::reconcilers::component::{ManagedKind, Snapshot};
use crate::status_reasons::{
    CONDITION_TYPE_READY, REASON_ALL_READY, REASON_COMPONENTS_NOT_READY, REASON_DELETING,
    REASON_DELETION_PAUSED, REASON_NO_COMPONENTS,
};
use chrono::Utc;
use kube::ResourceExt;
use tracing::{debug, warn};

/// What a component's live objects currently report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentObservation {
    pub ready: bool,
    pub state: String,
}

/// Project a component's actual snapshot into its observed status.
#[must_use]
pub fn project_component(kind: &dyn ManagedKind, actual: &Snapshot) -> ComponentObservation {
    ComponentObservation {
        ready: kind.is_ready(actual),
        state: kind.status(actual),
    }
}

/// `true` when `observed` differs from what is recorded in status.
#[must_use]
pub fn observation_changed(recorded: &ComponentStatus, observed: &ComponentObservation) -> bool {
    recorded.ready != observed.ready || recorded.state != observed.state
}

/// Infer the global phase from the per-component states.
///
/// A deletion hold (`Deleting`, or `DeletionPaused` while any enabled component
/// still has backups on) is kept as is. Otherwise the phase is `Ready` once every
/// enabled component is ready, and a previously `Ready` deployment that lost a
/// component drops back to `Pending`.
#[must_use]
pub fn infer_phase(
    spec: &WeightsAndBiasesSpec,
    status: &WeightsAndBiasesStatus,
    flagged_for_deletion: bool,
) -> DeploymentPhase {
    let enabled: Vec<Component> = Component::ALL
        .into_iter()
        .filter(|c| spec.component(*c).enabled)
        .collect();

    let backups_on = enabled.iter().any(|c| spec.component(*c).backup.enabled);
    match status.state {
        DeploymentPhase::DeletionPaused if backups_on => return DeploymentPhase::DeletionPaused,
        DeploymentPhase::Deleting if flagged_for_deletion => return DeploymentPhase::Deleting,
        _ => {}
    }

    if enabled.iter().all(|c| status.component(*c).ready) {
        return DeploymentPhase::Ready;
    }

    match status.state {
        DeploymentPhase::Ready | DeploymentPhase::DeletionPaused | DeploymentPhase::Deleting => {
            DeploymentPhase::Pending
        }
        other => other,
    }
}

/// Recompute the `Ready` condition in place.
pub fn refresh_ready_condition(spec: &WeightsAndBiasesSpec, status: &mut WeightsAndBiasesStatus) {
    let enabled: Vec<Component> = Component::ALL
        .into_iter()
        .filter(|c| spec.component(*c).enabled)
        .collect();
    let waiting: Vec<String> = enabled
        .iter()
        .filter(|c| !status.component(**c).ready)
        .map(ToString::to_string)
        .collect();

    let (condition_status, reason, message) = match status.state {
        DeploymentPhase::Deleting => ("False", REASON_DELETING, status.message.clone()),
        DeploymentPhase::DeletionPaused => {
            ("False", REASON_DELETION_PAUSED, status.message.clone())
        }
        _ if enabled.is_empty() => (
            "True",
            REASON_NO_COMPONENTS,
            "No infrastructure components are enabled".to_string(),
        ),
        _ if waiting.is_empty() => (
            "True",
            REASON_ALL_READY,
            format!("All {} enabled components are ready", enabled.len()),
        ),
        _ => (
            "False",
            REASON_COMPONENTS_NOT_READY,
            format!("Waiting for: {}", waiting.join(", ")),
        ),
    };

    update_condition_in_memory(
        &mut status.conditions,
        CONDITION_TYPE_READY,
        condition_status,
        reason,
        &message,
    );
}

/// Write the owner's status, adopting the returned resource version.
///
/// # Errors
///
/// Returns the cluster error when the status subresource rejects the write.
pub async fn write_status(cluster: &dyn ClusterApi, owner: &mut WeightsAndBiases) -> Result<(), ClusterError> {
    let updated = cluster.patch_status(owner).await?;
    debug!(
        "Updated status of {}/{}",
        owner.namespace().unwrap_or_default(),
        owner.name_any()
    );
    owner.metadata.resource_version = updated.metadata.resource_version;
    Ok(())
}

/// Write the owner's status, adopting the returned object on success.
///
/// Status is observational, so a failed write is logged and reported as `false`
/// instead of failing the pass.
pub async fn persist_status(cluster: &dyn ClusterApi, owner: &mut WeightsAndBiases) -> bool {
    match write_status(cluster, owner).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "Failed to update status of {}/{}: {}",
                owner.namespace().unwrap_or_default(),
                owner.name_any(),
                e
            );
            false
        }
    }
}

/// Mutable access to the owner's status, creating it when absent.
pub fn status_mut(owner: &mut WeightsAndBiases) -> &mut WeightsAndBiasesStatus {
    owner.status.get_or_insert_with(WeightsAndBiasesStatus::default)
}

/// Create a new Kubernetes condition with the current timestamp.
///
/// # Arguments
///
/// * `condition_type` - The type of condition (e.g., "Ready")
/// * `status` - The status: "True", "False", or "Unknown"
/// * `reason` - A programmatic identifier in `CamelCase`
/// * `message` - A human-readable explanation
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// `true` when `new_condition` differs from `existing` in type, status or message.
///
/// A missing existing condition always counts as a change.
#[must_use]
pub fn condition_changed(existing: Option<&Condition>, new_condition: &Condition) -> bool {
    existing.is_none_or(|current| {
        current.r#type != new_condition.r#type
            || current.status != new_condition.status
            || current.message != new_condition.message
    })
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// The `lastTransitionTime` is preserved when the status value is unchanged.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
