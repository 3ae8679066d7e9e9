// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ClusterApi`] used by unit tests.
//!
//! Objects are stored by `(kind, namespace, name)`. Every mutating call is appended
//! to a journal so tests can assert exactly which writes a pass made. Individual
//! verbs can be made to fail to exercise error paths.

use super::{ClusterApi, ObjectKey};
use crate::crd::{Component, ComponentSpec, DeploymentSize, WeightsAndBiases, WeightsAndBiasesSpec};
use crate::errors::ClusterError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{DynamicObject, ObjectMeta};
use kube::ResourceExt;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

type Key = (String, String, String);

#[derive(Default)]
pub struct FakeCluster {
    objects: Mutex<BTreeMap<Key, DynamicObject>>,
    secrets: Mutex<BTreeMap<(String, String), Secret>>,
    journal: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `verb` (e.g. `"create Kafka"`, `"patch_status"`) fail.
    pub fn fail_on(&self, verb: &str) {
        self.failing.lock().unwrap().insert(verb.to_string());
    }

    pub fn insert_object(&self, key: &ObjectKey, object: DynamicObject) {
        self.objects.lock().unwrap().insert(
            (key.kind().to_string(), key.namespace.clone(), key.name.clone()),
            object,
        );
    }

    pub fn object(&self, key: &ObjectKey) -> Option<DynamicObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(key.kind().to_string(), key.namespace.clone(), key.name.clone()))
            .cloned()
    }

    pub fn insert_secret(&self, namespace: &str, secret: Secret) {
        self.secrets
            .lock()
            .unwrap()
            .insert((namespace.to_string(), secret.name_any()), secret);
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Mutating calls made so far, e.g. `"create Kafka wandb/wandb-kafka"`.
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().unwrap().clear();
    }

    fn record(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }

    fn check(&self, verb: &str, kind: &str, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let failing = self.failing.lock().unwrap();
        if failing.contains(verb) || failing.contains(&format!("{verb} {kind}")) {
            return Err(ClusterError::Request {
                verb: "call",
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                reason: format!("injected failure for {verb}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn get_object(&self, key: &ObjectKey) -> Result<Option<DynamicObject>, ClusterError> {
        self.check("get", key.kind(), &key.namespace, &key.name)?;
        Ok(self.object(key))
    }

    async fn create_object(
        &self,
        key: &ObjectKey,
        object: &DynamicObject,
    ) -> Result<(), ClusterError> {
        self.check("create", key.kind(), &key.namespace, &key.name)?;
        self.record(format!("create {} {}/{}", key.kind(), key.namespace, key.name));
        let mut objects = self.objects.lock().unwrap();
        objects
            .entry((key.kind().to_string(), key.namespace.clone(), key.name.clone()))
            .or_insert_with(|| object.clone());
        Ok(())
    }

    async fn delete_object(&self, key: &ObjectKey) -> Result<(), ClusterError> {
        self.check("delete", key.kind(), &key.namespace, &key.name)?;
        self.record(format!("delete {} {}/{}", key.kind(), key.namespace, key.name));
        self.objects.lock().unwrap().remove(&(
            key.kind().to_string(),
            key.namespace.clone(),
            key.name.clone(),
        ));
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ClusterError> {
        self.check("get", "Secret", namespace, name)?;
        Ok(self.secret(namespace, name))
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<(), ClusterError> {
        let name = secret.name_any();
        self.check("create", "Secret", namespace, &name)?;
        self.record(format!("create Secret {namespace}/{name}"));
        self.secrets
            .lock()
            .unwrap()
            .entry((namespace.to_string(), name))
            .or_insert_with(|| secret.clone());
        Ok(())
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.check("delete", "Secret", namespace, name)?;
        self.record(format!("delete Secret {namespace}/{name}"));
        self.secrets
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        Ok(())
    }

    async fn patch_finalizers(
        &self,
        owner: &WeightsAndBiases,
        finalizers: Vec<String>,
    ) -> Result<WeightsAndBiases, ClusterError> {
        let namespace = owner.namespace().unwrap_or_default();
        self.check("patch_finalizers", "WeightsAndBiases", &namespace, &owner.name_any())?;
        self.record(format!("patch_finalizers {}", finalizers.join(",")));
        let mut updated = owner.clone();
        updated.metadata.finalizers = Some(finalizers);
        Ok(updated)
    }

    async fn patch_status(
        &self,
        owner: &WeightsAndBiases,
    ) -> Result<WeightsAndBiases, ClusterError> {
        let namespace = owner.namespace().unwrap_or_default();
        self.check("patch_status", "WeightsAndBiases", &namespace, &owner.name_any())?;
        self.record("patch_status".to_string());
        Ok(owner.clone())
    }

    async fn revert_deletion(
        &self,
        owner: &WeightsAndBiases,
    ) -> Result<WeightsAndBiases, ClusterError> {
        let namespace = owner.namespace().unwrap_or_default();
        self.check("revert_deletion", "WeightsAndBiases", &namespace, &owner.name_any())?;
        self.record("revert_deletion".to_string());
        let mut updated = owner.clone();
        updated.metadata.deletion_timestamp = None;
        Ok(updated)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A `WeightsAndBiases` named `wandb` in namespace `wandb`.
pub fn owner(spec: WeightsAndBiasesSpec) -> WeightsAndBiases {
    let mut owner = WeightsAndBiases::new("wandb", spec);
    owner.metadata = ObjectMeta {
        name: Some("wandb".to_string()),
        namespace: Some("wandb".to_string()),
        uid: Some("6f1c7d2e-4a7b-4a53-9a51-0d1f6c1e2b3a".to_string()),
        generation: Some(1),
        resource_version: Some("1".to_string()),
        ..Default::default()
    };
    owner.status = Some(Default::default());
    owner
}

/// Mark `owner` as deleted.
pub fn flag_for_deletion(owner: &mut WeightsAndBiases) {
    owner.metadata.deletion_timestamp = Some(Time(k8s_openapi::jiff::Timestamp::now()));
}

/// Set the owner's finalizers.
pub fn with_finalizers(owner: &mut WeightsAndBiases, finalizers: &[&str]) {
    owner.metadata.finalizers = Some(finalizers.iter().map(ToString::to_string).collect());
}

/// A dynamic object at `key` with the given body merged in.
pub fn object_with(key: &ObjectKey, body: serde_json::Value) -> DynamicObject {
    key.new_object().data(body)
}

/// A spec of `size` with `enabled` components switched on.
pub fn spec_with(size: DeploymentSize, enabled: &[Component]) -> WeightsAndBiasesSpec {
    let mut spec = WeightsAndBiasesSpec {
        size,
        ..Default::default()
    };
    for component in enabled {
        component_spec_mut(&mut spec, *component).enabled = true;
    }
    spec
}

/// Mutable access to one component's spec block.
pub fn component_spec_mut(spec: &mut WeightsAndBiasesSpec, component: Component) -> &mut ComponentSpec {
    match component {
        Component::Mysql => &mut spec.mysql,
        Component::Redis => &mut spec.redis,
        Component::Kafka => &mut spec.kafka,
        Component::Minio => &mut spec.minio,
        Component::ClickHouse => &mut spec.clickhouse,
    }
}
