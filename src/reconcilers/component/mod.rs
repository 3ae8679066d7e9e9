// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic reconciliation pipeline for one managed infrastructure component.
//!
//! Every component (MySQL, Redis, Kafka, MinIO, ClickHouse) runs through the same
//! steps each pass:
//!
//! 1. [`snapshot::load_actual`] - read the live primary, dependent and connection secret
//! 2. [`deletion::guard`] - finalizer and pre-deletion backup protocol
//! 3. [`desired::build_desired`] - compute what should exist
//! 4. [`drift::select_action`] - pick at most one action
//! 5. [`executor::execute`] - perform it and record the transition in status
//!
//! What differs between components is captured by the [`ManagedKind`] trait,
//! implemented once per component in [`crate::reconcilers::kinds`].

pub mod deletion;
pub mod desired;
pub mod drift;
pub mod executor;
pub mod snapshot;

use crate::cluster::{ClusterApi, ObjectKey};
use crate::crd::{BackupStorageType, Component, DeploymentSize, WeightsAndBiases};
use crate::errors::ValidationError;
use crate::reconcilers::backup::BackupExecutor;
use crate::reconcilers::state::{ExitScope, ReconcileState};
use kube::api::DynamicObject;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub use desired::ResolvedSpec;
pub use snapshot::Snapshot;

/// Storage and replica defaults of one size profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeDefaults {
    pub storage_size: &'static str,
    pub replicas: i32,
}

/// Identities of the objects making up a component.
#[derive(Clone, Debug)]
pub struct Layout {
    /// The object whose existence means "installed".
    pub primary: ObjectKey,
    /// An object that must exist before the primary is created.
    pub dependent: Option<ObjectKey>,
    /// Name of the connection secret, in the primary's namespace.
    pub secret_name: String,
}

impl Layout {
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.primary.namespace
    }
}

/// Capabilities a component kind provides to the generic pipeline.
///
/// Implementations are stateless unit structs. Defaults and object shapes are data
/// returned from these methods; the pipeline never branches on the component.
pub trait ManagedKind: Send + Sync {
    fn component(&self) -> Component;

    /// Storage and replica defaults for a size profile.
    fn defaults(&self, size: DeploymentSize) -> SizeDefaults;

    /// Backup storage backends the vendored operator supports. Empty means no backups.
    fn backup_storage(&self) -> &'static [BackupStorageType];

    /// Name of the primary object when the spec sets none.
    fn default_name(&self) -> &'static str;

    /// Object identities in `namespace` for a primary named `name`.
    fn layout_named(&self, namespace: &str, name: &str, size: DeploymentSize) -> Layout;

    /// Object identities in `namespace` under the default name.
    fn layout(&self, namespace: &str, size: DeploymentSize) -> Layout {
        self.layout_named(namespace, self.default_name(), size)
    }

    /// Fill in the primary object.
    fn render_primary(&self, spec: &ResolvedSpec, object: DynamicObject) -> DynamicObject;

    /// Fill in the dependent object, when the layout has one.
    fn render_dependent(&self, _spec: &ResolvedSpec, _object: DynamicObject) -> Option<DynamicObject> {
        None
    }

    /// Whether the live objects report themselves healthy.
    fn is_ready(&self, actual: &Snapshot) -> bool;

    /// Short status string for the component, e.g. `ready` or `pending`.
    fn status(&self, actual: &Snapshot) -> String;

    /// Key/value pairs written to the connection secret once the component is ready.
    fn connection_info(&self, spec: &ResolvedSpec, actual: &Snapshot) -> BTreeMap<String, String>;

    /// Executor running this component's pre-deletion backup.
    fn backup_executor(&self) -> &'static dyn BackupExecutor;
}

/// Namespace a component's objects live in.
///
/// # Errors
///
/// Returns [`ValidationError::MissingNamespace`] when the component sets no namespace
/// and the owner has none either.
pub fn component_namespace(owner: &WeightsAndBiases, component: Component) -> Result<String, ValidationError> {
    let configured = &owner.spec.component(component).namespace;
    if !configured.is_empty() {
        return Ok(configured.clone());
    }
    owner
        .namespace()
        .filter(|ns| !ns.is_empty())
        .ok_or(ValidationError::MissingNamespace { component })
}

/// Name of a component's primary object.
#[must_use]
pub fn component_name(owner: &WeightsAndBiases, kind: &dyn ManagedKind) -> String {
    let configured = owner.spec.component(kind.component()).name.trim();
    if configured.is_empty() {
        kind.default_name().to_string()
    } else {
        configured.to_string()
    }
}

/// Run one pass of the pipeline for `kind`.
///
/// `owner` is updated in place with whatever the cluster returned from finalizer and
/// status writes, so later components see the latest `resourceVersion`.
///
/// # Returns
///
/// The combined [`ReconcileState`] of the deletion guard and executed action.
/// `Component` scope means this component made a change or is waiting;
/// `Reconciler` scope means the pass must stop.
pub async fn reconcile_component(
    cluster: &dyn ClusterApi,
    owner: &mut WeightsAndBiases,
    kind: &dyn ManagedKind,
) -> ReconcileState {
    let component = kind.component();
    let namespace = match component_namespace(owner, component) {
        Ok(namespace) => namespace,
        Err(e) => return ReconcileState::fail(e),
    };
    let layout = kind.layout_named(&namespace, &component_name(owner, kind), owner.spec.size);

    debug!(
        component = %component,
        namespace = %namespace,
        "Reconciling component"
    );

    let actual = match snapshot::load_actual(cluster, &layout).await {
        Ok(actual) => actual,
        Err(e) => return ReconcileState::fail(e),
    };

    let guard = deletion::guard(cluster, owner, kind, kind.backup_executor(), &actual).await;
    if guard.state.should_exit(ExitScope::Component) {
        debug!(component = %component, "Deletion guard ended component pass");
        return guard.state;
    }

    let desired = if guard.teardown {
        info!(
            "Tearing down {} for {}/{}",
            component,
            namespace,
            owner.name_any()
        );
        Snapshot::absent()
    } else {
        match desired::build_desired(kind, owner, &actual) {
            Ok(desired) => desired,
            Err(e) => return guard.state.combine(ReconcileState::fail(e)),
        }
    };

    let recorded = owner
        .status
        .as_ref()
        .map(|s| s.component(component).clone())
        .unwrap_or_default();

    match drift::select_action(kind, &layout, &desired, &actual, &recorded) {
        Some(action) => {
            let outcome = executor::execute(cluster, owner, component, action).await;
            guard.state.combine(outcome)
        }
        None => {
            debug!(component = %component, "Component converged");
            guard.state.combine(ReconcileState::none())
        }
    }
}
