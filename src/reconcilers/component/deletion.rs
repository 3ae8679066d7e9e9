// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer-gated deletion protocol.
//!
//! Each component keeps its own finalizer on the `WeightsAndBiases` resource so
//! that, once the resource is deleted, the component's data can be backed up before
//! its objects are garbage-collected.
//!
//! ```text
//! Active ──add finalizer──▶ Guarded ──flagged, backups off──▶ Removed
//!                              │
//!                              └─flagged, backups on──▶ BackingUp ──completed/skipped──▶ Removed
//!                                                          │
//!                                                          └─failed──▶ DeletionPaused (sticky)
//! ```
//!
//! Only a failed or timed-out backup pauses deletion. A cluster error while starting
//! or polling the backup fails the pass and is retried with backoff.
//!
//! [`decide`] is the pure transition function; [`guard`] applies its decision
//! through the cluster API and records the outcome in status.

use super::desired::resolve_backup;
use super::{component_name, component_namespace, ManagedKind, Snapshot};
use crate::cluster::ClusterApi;
use crate::constants::{BACKUP_REQUEUE_SECS, STATE_STOPPING};
use crate::crd::{BackupPhase, BackupStatus, Component, DeploymentPhase, WeightsAndBiases};
use crate::errors::ReconcileError;
use crate::labels::finalizer_for;
use crate::metrics;
use crate::reconcilers::backup::{BackupExecutor, BackupRequest, BackupResult};
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use crate::reconcilers::state::{ExitScope, ReconcileState};
use crate::reconcilers::status::{persist_status, status_mut, write_status};
use chrono::Utc;
use kube::ResourceExt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Facts the guard decides on, for one component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GuardInput {
    /// The component is enabled in spec.
    pub enabled: bool,
    /// The owner carries a deletion timestamp.
    pub flagged: bool,
    /// The component is enabled with backups on.
    pub backup_enabled: bool,
    /// The owner carries this component's finalizer.
    pub has_finalizer: bool,
    /// The owner's global phase is `DeletionPaused`.
    pub deletion_paused: bool,
    /// None of the component's objects exist.
    pub fully_absent: bool,
}

/// What the guard does this pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Nothing to do; reconcile normally.
    Continue,
    /// Persist the finalizer before any other work.
    AddFinalizer,
    /// Disabled and gone: drop the finalizer.
    ReleaseDisabled,
    /// Deleting and no longer guarded: tear the component down.
    Teardown,
    /// Deleting with nothing to back up: drop the finalizer, then tear down.
    ReleaseAndTeardown,
    /// An earlier backup failed; hold until backups are disabled.
    HoldPaused,
    /// Deleting with backups on: start or poll the backup.
    RunBackup,
}

/// Pick the guard's transition for one component.
///
/// A disabled component never backs up. The paused hold is checked after the fast
/// path so that disabling backups releases a paused deletion, and after the
/// finalizer is in place so that a component enabled while paused is still guarded.
#[must_use]
pub fn decide(input: &GuardInput) -> GuardDecision {
    if !input.enabled {
        return if input.has_finalizer && input.fully_absent {
            GuardDecision::ReleaseDisabled
        } else {
            GuardDecision::Continue
        };
    }
    if input.flagged && !input.has_finalizer {
        return GuardDecision::Teardown;
    }
    if input.flagged && (!input.backup_enabled || input.fully_absent) {
        return GuardDecision::ReleaseAndTeardown;
    }
    if !input.has_finalizer && !input.flagged {
        return GuardDecision::AddFinalizer;
    }
    if input.deletion_paused && input.backup_enabled {
        return GuardDecision::HoldPaused;
    }
    if input.flagged {
        return GuardDecision::RunBackup;
    }
    GuardDecision::Continue
}

/// Result of the guard for one component.
#[derive(Clone, Debug)]
pub struct GuardOutcome {
    /// `Component` scope or wider ends the component's pass.
    pub state: ReconcileState,
    /// Converge the component to absent instead of its spec.
    pub teardown: bool,
}

impl GuardOutcome {
    fn proceed() -> Self {
        Self {
            state: ReconcileState::none(),
            teardown: false,
        }
    }

    fn teardown() -> Self {
        Self {
            state: ReconcileState::none(),
            teardown: true,
        }
    }

    fn stop(state: ReconcileState) -> Self {
        Self {
            state,
            teardown: false,
        }
    }
}

/// Gather the guard's facts for `kind`.
#[must_use]
pub fn guard_input(owner: &WeightsAndBiases, component: Component, actual: &Snapshot) -> GuardInput {
    let spec = owner.spec.component(component);
    GuardInput {
        enabled: spec.enabled,
        flagged: owner.metadata.deletion_timestamp.is_some(),
        backup_enabled: spec.enabled && spec.backup.enabled,
        has_finalizer: has_finalizer(owner, finalizer_for(component)),
        deletion_paused: owner
            .status
            .as_ref()
            .is_some_and(|s| s.state == DeploymentPhase::DeletionPaused),
        fully_absent: actual.is_absent(),
    }
}

/// Run the deletion protocol for one component.
///
/// `owner` adopts the metadata returned by every finalizer or deletion write, and its
/// status records backup progress.
pub async fn guard(
    cluster: &dyn ClusterApi,
    owner: &mut WeightsAndBiases,
    kind: &dyn ManagedKind,
    executor: &dyn BackupExecutor,
    actual: &Snapshot,
) -> GuardOutcome {
    let component = kind.component();
    let finalizer = finalizer_for(component);
    let input = guard_input(owner, component, actual);
    let decision = decide(&input);

    debug!(component = %component, decision = ?decision, "Deletion guard");

    match decision {
        GuardDecision::Continue => GuardOutcome::proceed(),
        GuardDecision::HoldPaused => {
            info!(
                "Deletion of {} {}/{} is paused after a failed backup; disable backups to continue",
                component,
                owner.namespace().unwrap_or_default(),
                owner.name_any()
            );
            GuardOutcome::proceed()
        }
        GuardDecision::AddFinalizer => match ensure_finalizer(cluster, owner, finalizer).await {
            Ok(updated) => {
                owner.metadata = updated.metadata;
                GuardOutcome::stop(ReconcileState::done(ExitScope::Component))
            }
            Err(e) => GuardOutcome::stop(ReconcileState::fail(e)),
        },
        GuardDecision::ReleaseDisabled => match remove_finalizer(cluster, owner, finalizer).await {
            Ok(updated) => {
                owner.metadata = updated.metadata;
                GuardOutcome::stop(ReconcileState::done(ExitScope::Component))
            }
            Err(e) => GuardOutcome::stop(ReconcileState::fail(e)),
        },
        GuardDecision::Teardown => GuardOutcome::teardown(),
        GuardDecision::ReleaseAndTeardown => {
            if !input.backup_enabled {
                let backup = &mut status_mut(owner).component_mut(component).backup_status;
                if backup.state != BackupPhase::Skipped {
                    *backup = skipped_status("Backups are disabled");
                    metrics::record_backup(component.key(), "skipped");
                }
            }
            match remove_finalizer(cluster, owner, finalizer).await {
                Ok(updated) => {
                    owner.metadata = updated.metadata;
                    GuardOutcome::teardown()
                }
                Err(e) => GuardOutcome::stop(ReconcileState::fail(e)),
            }
        }
        GuardDecision::RunBackup => run_backup(cluster, owner, kind, executor).await,
    }
}

fn skipped_status(message: &str) -> BackupStatus {
    let now = Utc::now().to_rfc3339();
    BackupStatus {
        completed_at: Some(now.clone()),
        last_backup_time: Some(now),
        state: BackupPhase::Skipped,
        message: message.to_string(),
        ..BackupStatus::default()
    }
}

async fn run_backup(
    cluster: &dyn ClusterApi,
    owner: &mut WeightsAndBiases,
    kind: &dyn ManagedKind,
    executor: &dyn BackupExecutor,
) -> GuardOutcome {
    let component = kind.component();
    // Teardown must not depend on the rest of the spec still validating.
    let backup = resolve_backup(&owner.spec.component(component).backup);
    let namespace = match component_namespace(owner, component) {
        Ok(namespace) => namespace,
        Err(e) => return GuardOutcome::stop(ReconcileState::fail(e)),
    };
    let layout = kind.layout_named(&namespace, &component_name(owner, kind), owner.spec.size);
    let previous = owner
        .status
        .as_ref()
        .map(|s| s.component(component).backup_status.clone())
        .unwrap_or_default();

    let request = BackupRequest {
        component,
        namespace,
        cluster_name: layout.primary.name.clone(),
        storage_name: backup.storage_name,
        storage_type: backup.storage_type,
        timeout_seconds: backup.timeout_seconds,
        requested_at: owner
            .metadata
            .deletion_timestamp
            .as_ref()
            .map_or_else(Utc::now, |t| chrono::DateTime::from_timestamp_nanos(t.0.as_nanosecond() as i64)),
        previous,
    };

    match executor.run(cluster, &request).await {
        // An unreachable API server says nothing about the backup itself.
        Err(ReconcileError::Cluster(e)) => {
            warn!(
                "Could not check {} backup for {}/{}: {}",
                component,
                owner.namespace().unwrap_or_default(),
                owner.name_any(),
                e
            );
            GuardOutcome::stop(ReconcileState::fail(e))
        }
        Err(e) => pause_deletion(cluster, owner, component, &e).await,
        Ok(result) if result.is_terminal() => release_after_backup(cluster, owner, component, result).await,
        Ok(result) => wait_for_backup(cluster, owner, component, result).await,
    }
}

async fn pause_deletion(
    cluster: &dyn ClusterApi,
    owner: &mut WeightsAndBiases,
    component: Component,
    cause: &ReconcileError,
) -> GuardOutcome {
    error!(
        "{} backup before deletion of {}/{} failed: {}",
        component,
        owner.namespace().unwrap_or_default(),
        owner.name_any(),
        cause
    );
    metrics::record_backup(component.key(), "failed");

    match cluster.revert_deletion(owner).await {
        Ok(updated) => owner.metadata = updated.metadata,
        Err(e) => return GuardOutcome::stop(ReconcileState::fail(e)),
    }

    let status = status_mut(owner);
    status.state = DeploymentPhase::DeletionPaused;
    status.message = format!(
        "{component} backup before deletion failed, deletion paused. Disable backups to continue with deletion."
    );
    let backup = &mut status.component_mut(component).backup_status;
    backup.state = BackupPhase::Failed;
    backup.message = cause.to_string();
    backup.last_backup_time = Some(Utc::now().to_rfc3339());
    backup.requeue_after = 0;

    persist_status(cluster, owner).await;
    GuardOutcome::stop(ReconcileState::done(ExitScope::Component))
}

async fn wait_for_backup(
    cluster: &dyn ClusterApi,
    owner: &mut WeightsAndBiases,
    component: Component,
    result: BackupResult,
) -> GuardOutcome {
    let requeue = result
        .requeue_after
        .filter(|d| !d.is_zero())
        .unwrap_or(Duration::from_secs(BACKUP_REQUEUE_SECS));

    info!(
        "Waiting for {} backup {} before deletion of {}/{}",
        component,
        result.backup_name,
        owner.namespace().unwrap_or_default(),
        owner.name_any()
    );
    metrics::record_backup(component.key(), "in_progress");

    let status = status_mut(owner);
    status.state = DeploymentPhase::Deleting;
    status.message = format!("Waiting for {component} backup to complete before deletion");
    let entry = status.component_mut(component);
    entry.ready = false;
    entry.state = STATE_STOPPING.to_string();
    entry.backup_status = BackupStatus {
        backup_name: result.backup_name,
        started_at: result.started_at,
        completed_at: None,
        last_backup_time: entry.backup_status.last_backup_time.clone(),
        state: BackupPhase::InProgress,
        message: result.message,
        requeue_after: i64::try_from(requeue.as_secs()).unwrap_or(i64::MAX),
    };

    // The next pass polls the backup named here, so the write must land.
    if let Err(e) = write_status(cluster, owner).await {
        return GuardOutcome::stop(ReconcileState::fail(e));
    }
    GuardOutcome::stop(ReconcileState::done_until(ExitScope::Component, requeue))
}

async fn release_after_backup(
    cluster: &dyn ClusterApi,
    owner: &mut WeightsAndBiases,
    component: Component,
    result: BackupResult,
) -> GuardOutcome {
    let outcome = if result.phase == BackupPhase::Skipped {
        "skipped"
    } else {
        "completed"
    };
    info!(
        "{} backup {} for {}/{}: {}",
        component,
        outcome,
        owner.namespace().unwrap_or_default(),
        owner.name_any(),
        result.message
    );
    metrics::record_backup(component.key(), outcome);

    let completed_at = result
        .completed_at
        .unwrap_or_else(|| Utc::now().to_rfc3339());
    status_mut(owner).component_mut(component).backup_status = BackupStatus {
        backup_name: result.backup_name,
        started_at: result.started_at,
        completed_at: Some(completed_at.clone()),
        last_backup_time: Some(completed_at),
        state: result.phase,
        message: result.message,
        requeue_after: 0,
    };

    // Record the outcome while the resource still exists.
    if !persist_status(cluster, owner).await {
        warn!("{} backup outcome not recorded before finalizer removal", component);
    }

    match remove_finalizer(cluster, owner, finalizer_for(component)).await {
        Ok(updated) => {
            owner.metadata = updated.metadata;
            GuardOutcome::stop(ReconcileState::done(ExitScope::Component))
        }
        Err(e) => GuardOutcome::stop(ReconcileState::fail(e)),
    }
}

#[cfg(test)]
#[path = "deletion_tests.rs"]
mod deletion_tests;
