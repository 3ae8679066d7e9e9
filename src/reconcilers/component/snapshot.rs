// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Component snapshots and the loader that reads them from the cluster.

use super::Layout;
use crate::cluster::ClusterApi;
use crate::errors::ClusterError;
use k8s_openapi::api::core::v1::Secret;
use kube::api::DynamicObject;
use tracing::debug;

/// The objects of one component at one instant, either live (actual) or intended
/// (desired).
///
/// A component is *installed* exactly when its primary object is present; there is
/// no separate flag that could disagree.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    primary: Option<DynamicObject>,
    dependent: Option<DynamicObject>,
    secret: Option<Secret>,
}

impl Snapshot {
    /// Nothing installed.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(
        primary: Option<DynamicObject>,
        dependent: Option<DynamicObject>,
        secret: Option<Secret>,
    ) -> Self {
        Self {
            primary,
            dependent,
            secret,
        }
    }

    #[must_use]
    pub fn with_primary(mut self, primary: DynamicObject) -> Self {
        self.primary = Some(primary);
        self
    }

    #[must_use]
    pub fn with_dependent(mut self, dependent: DynamicObject) -> Self {
        self.dependent = Some(dependent);
        self
    }

    #[must_use]
    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.secret = Some(secret);
        self
    }

    #[must_use]
    pub fn installed(&self) -> bool {
        self.primary.is_some()
    }

    #[must_use]
    pub fn dependent_installed(&self) -> bool {
        self.dependent.is_some()
    }

    #[must_use]
    pub fn secret_installed(&self) -> bool {
        self.secret.is_some()
    }

    /// `true` when none of the component's objects exist.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.primary.is_none() && self.dependent.is_none() && self.secret.is_none()
    }

    #[must_use]
    pub fn primary(&self) -> Option<&DynamicObject> {
        self.primary.as_ref()
    }

    #[must_use]
    pub fn dependent(&self) -> Option<&DynamicObject> {
        self.dependent.as_ref()
    }

    #[must_use]
    pub fn secret(&self) -> Option<&Secret> {
        self.secret.as_ref()
    }
}

/// Read the live objects named by `layout`.
///
/// A missing object becomes an absent field. The primary is read first and any
/// other failure aborts the load before the dependent and secret are read.
///
/// # Errors
///
/// Returns the first read failure that is not "not found".
pub async fn load_actual(cluster: &dyn ClusterApi, layout: &Layout) -> Result<Snapshot, ClusterError> {
    let primary = cluster.get_object(&layout.primary).await?;

    let dependent = match &layout.dependent {
        Some(key) => cluster.get_object(key).await?,
        None => None,
    };

    let secret = cluster
        .get_secret(layout.namespace(), &layout.secret_name)
        .await?;

    debug!(
        primary = primary.is_some(),
        dependent = dependent.is_some(),
        secret = secret.is_some(),
        "Loaded {} {}/{}",
        layout.primary.kind(),
        layout.primary.namespace,
        layout.primary.name
    );

    Ok(Snapshot::new(primary, dependent, secret))
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod snapshot_tests;
