// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Drift detection and action selection.
//!
//! [`select_action`] compares the desired and actual snapshots of a component and
//! returns the single next step, or `None` once converged. Rules are checked in a
//! fixed order and the first match wins:
//!
//! 1. dependent wanted but missing → [`Action::CreateDependent`]
//! 2. dependent present but unwanted → [`Action::DeleteDependent`], unless the
//!    primary it backs is itself still being removed
//! 3. primary present but unwanted → [`Action::DeleteSecret`] if the secret still
//!    exists, otherwise [`Action::DeletePrimary`]
//! 4. primary wanted but missing → [`Action::CreatePrimary`]
//! 5. secret wanted but missing → [`Action::CreateSecret`]
//! 6. projected status differs from the recorded one → [`Action::UpdateStatus`]
//!
//! Creation therefore flows dependent → primary → secret and deletion flows
//! secret → primary → dependent, one step per pass.

use super::{Layout, ManagedKind, Snapshot};
use crate::cluster::ObjectKey;
use crate::crd::ComponentStatus;
use crate::reconcilers::status::{observation_changed, project_component, ComponentObservation};
use k8s_openapi::api::core::v1::Secret;
use kube::api::DynamicObject;
use std::fmt;

/// One mutation against the cluster.
#[derive(Clone, Debug)]
pub enum Action {
    CreateDependent { key: ObjectKey, object: DynamicObject },
    DeleteDependent { key: ObjectKey },
    DeleteSecret { namespace: String, name: String },
    DeletePrimary { key: ObjectKey },
    CreatePrimary { key: ObjectKey, object: DynamicObject },
    CreateSecret { secret: Secret },
    UpdateStatus { observed: ComponentObservation },
}

impl Action {
    /// Stable snake_case name used in logs and metrics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateDependent { .. } => "create_dependent",
            Self::DeleteDependent { .. } => "delete_dependent",
            Self::DeleteSecret { .. } => "delete_secret",
            Self::DeletePrimary { .. } => "delete_primary",
            Self::CreatePrimary { .. } => "create_primary",
            Self::CreateSecret { .. } => "create_secret",
            Self::UpdateStatus { .. } => "update_status",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pick the next action for a component, or `None` when nothing needs doing.
#[must_use]
pub fn select_action(
    kind: &dyn ManagedKind,
    layout: &Layout,
    desired: &Snapshot,
    actual: &Snapshot,
    recorded: &ComponentStatus,
) -> Option<Action> {
    if let (Some(object), false, Some(key)) = (
        desired.dependent(),
        actual.dependent_installed(),
        &layout.dependent,
    ) {
        return Some(Action::CreateDependent {
            key: key.clone(),
            object: object.clone(),
        });
    }

    // A dependent still backing a live primary that is itself being removed waits
    // for rule 3, so teardown stays secret → primary → dependent.
    let primary_retiring = !desired.installed() && actual.installed();
    if let (false, true, false, Some(key)) = (
        desired.dependent_installed(),
        actual.dependent_installed(),
        primary_retiring,
        &layout.dependent,
    ) {
        return Some(Action::DeleteDependent { key: key.clone() });
    }

    let secret_orphaned = !desired.installed() && actual.secret_installed();
    if primary_retiring || secret_orphaned {
        if actual.secret_installed() {
            return Some(Action::DeleteSecret {
                namespace: layout.namespace().to_string(),
                name: layout.secret_name.clone(),
            });
        }
        return Some(Action::DeletePrimary {
            key: layout.primary.clone(),
        });
    }

    if let (Some(object), false) = (desired.primary(), actual.installed()) {
        return Some(Action::CreatePrimary {
            key: layout.primary.clone(),
            object: object.clone(),
        });
    }

    if let (Some(secret), false) = (desired.secret(), actual.secret_installed()) {
        return Some(Action::CreateSecret {
            secret: secret.clone(),
        });
    }

    let observed = project_component(kind, actual);
    if observation_changed(recorded, &observed) {
        return Some(Action::UpdateStatus { observed });
    }

    None
}

#[cfg(test)]
#[path = "drift_tests.rs"]
mod drift_tests;
