// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster API seam used by the reconcilers.
//!
//! Reconcilers never talk to [`kube::Client`] directly. They go through the
//! [`ClusterApi`] trait so that absence is reported as `None` instead of an error,
//! writes carry the owner's `resourceVersion`, and tests can swap in an in-memory
//! cluster.
//!
//! Vendored custom resources (Strimzi `Kafka`, Percona `PerconaXtraDBCluster`, ...)
//! are handled as [`DynamicObject`]s addressed by an [`ObjectKey`].

use crate::constants::FIELD_MANAGER;
use crate::crd::WeightsAndBiases;
use crate::errors::ClusterError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ApiResource, DeleteParams, DynamicObject, Patch, PatchParams, PostParams};
use kube::core::GroupVersionKind;
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// API coordinates of a vendored custom resource kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CustomKind {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
}

impl CustomKind {
    #[must_use]
    pub fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(self.group, self.version, self.kind);
        ApiResource::from_gvk_with_plural(&gvk, self.plural)
    }
}

/// Address of one namespaced object of an arbitrary kind.
#[derive(Clone, Debug)]
pub struct ObjectKey {
    pub resource: ApiResource,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    /// Address an object of a custom resource kind.
    #[must_use]
    pub fn custom(kind: &CustomKind, namespace: &str, name: &str) -> Self {
        Self {
            resource: kind.api_resource(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Address a core `Secret` as a dynamic object.
    #[must_use]
    pub fn secret(namespace: &str, name: &str) -> Self {
        Self {
            resource: ApiResource::erase::<Secret>(&()),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// An empty object of this kind, ready to be filled in.
    #[must_use]
    pub fn new_object(&self) -> DynamicObject {
        DynamicObject::new(&self.name, &self.resource).within(&self.namespace)
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.resource.kind
    }
}

/// Operations the reconcilers need from the cluster.
///
/// Implementations must report "not found" as `Ok(None)` on reads and `Ok(())` on
/// deletes, and "already exists" as `Ok(())` on creates.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Read one object.
    async fn get_object(&self, key: &ObjectKey) -> Result<Option<DynamicObject>, ClusterError>;

    /// Create one object.
    async fn create_object(&self, key: &ObjectKey, object: &DynamicObject)
        -> Result<(), ClusterError>;

    /// Delete one object.
    async fn delete_object(&self, key: &ObjectKey) -> Result<(), ClusterError>;

    /// Read a secret.
    async fn get_secret(&self, namespace: &str, name: &str)
        -> Result<Option<Secret>, ClusterError>;

    /// Create a secret.
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<(), ClusterError>;

    /// Delete a secret.
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;

    /// Replace the owner's finalizer list. Returns the updated owner.
    async fn patch_finalizers(
        &self,
        owner: &WeightsAndBiases,
        finalizers: Vec<String>,
    ) -> Result<WeightsAndBiases, ClusterError>;

    /// Write the owner's status subresource. Returns the updated owner.
    async fn patch_status(&self, owner: &WeightsAndBiases)
        -> Result<WeightsAndBiases, ClusterError>;

    /// Clear the owner's deletion timestamp. Returns the updated owner.
    async fn revert_deletion(
        &self,
        owner: &WeightsAndBiases,
    ) -> Result<WeightsAndBiases, ClusterError>;
}

/// [`ClusterApi`] backed by a live Kubernetes API server.
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dynamic_api(&self, key: &ObjectKey) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), &key.namespace, &key.resource)
    }

    fn owner_api(&self, owner: &WeightsAndBiases) -> Api<WeightsAndBiases> {
        Api::namespaced(self.client.clone(), &owner.namespace().unwrap_or_default())
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

/// `true` for a 404 from the API server.
/// Merge patch writing the owner's status under the resource version it was read at.
pub(crate) fn status_patch(owner: &WeightsAndBiases) -> Result<serde_json::Value, ClusterError> {
    let status = serde_json::to_value(&owner.status).map_err(|e| ClusterError::Serialization {
        kind: "WeightsAndBiases".to_string(),
        name: owner.name_any(),
        reason: e.to_string(),
    })?;
    Ok(json!({
        "metadata": { "resourceVersion": owner.resource_version() },
        "status": status,
    }))
}

pub(crate) fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// `true` for a 409 from the API server (already exists or stale resourceVersion).
pub(crate) fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}

fn map_error(
    verb: &'static str,
    kind: &str,
    namespace: &str,
    name: &str,
    err: &kube::Error,
) -> ClusterError {
    if is_conflict(err) {
        return ClusterError::Conflict {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
    }
    ClusterError::Request {
        verb,
        kind: kind.to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn get_object(&self, key: &ObjectKey) -> Result<Option<DynamicObject>, ClusterError> {
        self.dynamic_api(key)
            .get_opt(&key.name)
            .await
            .map_err(|e| map_error("get", key.kind(), &key.namespace, &key.name, &e))
    }

    async fn create_object(
        &self,
        key: &ObjectKey,
        object: &DynamicObject,
    ) -> Result<(), ClusterError> {
        match self
            .dynamic_api(key)
            .create(&Self::post_params(), object)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_conflict(&e) => {
                debug!(
                    "{} {}/{} already exists",
                    key.kind(),
                    key.namespace,
                    key.name
                );
                Ok(())
            }
            Err(e) => Err(map_error(
                "create",
                key.kind(),
                &key.namespace,
                &key.name,
                &e,
            )),
        }
    }

    async fn delete_object(&self, key: &ObjectKey) -> Result<(), ClusterError> {
        match self
            .dynamic_api(key)
            .delete(&key.name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(
                    "{} {}/{} already deleted",
                    key.kind(),
                    key.namespace,
                    key.name
                );
                Ok(())
            }
            Err(e) => Err(map_error(
                "delete",
                key.kind(),
                &key.namespace,
                &key.name,
                &e,
            )),
        }
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ClusterError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| map_error("get", "Secret", namespace, name, &e))
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<(), ClusterError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let name = secret.name_any();
        match api.create(&Self::post_params(), secret).await {
            Ok(_) => Ok(()),
            Err(e) if is_conflict(&e) => {
                debug!("Secret {}/{} already exists", namespace, name);
                Ok(())
            }
            Err(e) => Err(map_error("create", "Secret", namespace, &name, &e)),
        }
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!("Secret {}/{} already deleted", namespace, name);
                Ok(())
            }
            Err(e) => Err(map_error("delete", "Secret", namespace, name, &e)),
        }
    }

    async fn patch_finalizers(
        &self,
        owner: &WeightsAndBiases,
        finalizers: Vec<String>,
    ) -> Result<WeightsAndBiases, ClusterError> {
        let name = owner.name_any();
        let namespace = owner.namespace().unwrap_or_default();
        let patch = json!({
            "metadata": {
                "resourceVersion": owner.resource_version(),
                "finalizers": finalizers,
            }
        });
        self.owner_api(owner)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_error("patch", "WeightsAndBiases", &namespace, &name, &e))
    }

    async fn patch_status(
        &self,
        owner: &WeightsAndBiases,
    ) -> Result<WeightsAndBiases, ClusterError> {
        let name = owner.name_any();
        let namespace = owner.namespace().unwrap_or_default();
        let patch = status_patch(owner)?;
        self.owner_api(owner)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_error("patch", "WeightsAndBiases", &namespace, &name, &e))
    }

    async fn revert_deletion(
        &self,
        owner: &WeightsAndBiases,
    ) -> Result<WeightsAndBiases, ClusterError> {
        let name = owner.name_any();
        let namespace = owner.namespace().unwrap_or_default();
        let patch = json!({ "metadata": { "deletionTimestamp": null } });
        self.owner_api(owner)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_error("patch", "WeightsAndBiases", &namespace, &name, &e))
    }
}

#[cfg(test)]
#[path = "cluster_fake.rs"]
pub(crate) mod fake;

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod cluster_tests;
