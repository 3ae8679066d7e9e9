// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared helpers for integration tests.
//!
//! [`MemoryCluster`] implements the public `ClusterApi` trait over plain maps, so the
//! full reconciliation loop can run without an API server.

#![allow(dead_code)]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DynamicObject, ObjectMeta};
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Mutex;
use wandb_operator::cluster::{ClusterApi, ObjectKey};
use wandb_operator::crd::{WeightsAndBiases, WeightsAndBiasesSpec};
use wandb_operator::errors::ClusterError;
use wandb_operator::reconcilers::reconcile_wandb;

type Key = (String, String, String);

fn key_of(key: &ObjectKey) -> Key {
    (key.kind().to_string(), key.namespace.clone(), key.name.clone())
}

#[derive(Default)]
pub struct MemoryCluster {
    objects: Mutex<BTreeMap<Key, DynamicObject>>,
    secrets: Mutex<BTreeMap<(String, String), Secret>>,
    writes: Mutex<usize>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, key: &ObjectKey) -> Option<DynamicObject> {
        self.objects.lock().unwrap().get(&key_of(key)).cloned()
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Replace the `status` of a stored object, as the upstream operator would.
    pub fn set_status(&self, key: &ObjectKey, status: serde_json::Value) {
        if let Some(object) = self.objects.lock().unwrap().get_mut(&key_of(key)) {
            object.data["status"] = status;
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len() + self.secrets.lock().unwrap().len()
    }

    /// Writes made since the last call.
    pub fn take_writes(&self) -> usize {
        std::mem::take(&mut *self.writes.lock().unwrap())
    }

    fn wrote(&self) {
        *self.writes.lock().unwrap() += 1;
    }
}

#[async_trait]
impl ClusterApi for MemoryCluster {
    async fn get_object(&self, key: &ObjectKey) -> Result<Option<DynamicObject>, ClusterError> {
        Ok(self.object(key))
    }

    async fn create_object(&self, key: &ObjectKey, object: &DynamicObject) -> Result<(), ClusterError> {
        self.wrote();
        self.objects
            .lock()
            .unwrap()
            .entry(key_of(key))
            .or_insert_with(|| object.clone());
        Ok(())
    }

    async fn delete_object(&self, key: &ObjectKey) -> Result<(), ClusterError> {
        self.wrote();
        self.objects.lock().unwrap().remove(&key_of(key));
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ClusterError> {
        Ok(self.secret(namespace, name))
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<(), ClusterError> {
        self.wrote();
        self.secrets
            .lock()
            .unwrap()
            .entry((namespace.to_string(), secret.name_any()))
            .or_insert_with(|| secret.clone());
        Ok(())
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.wrote();
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
        self.wrote();
        let mut updated = owner.clone();
        updated.metadata.finalizers = Some(finalizers);
        Ok(updated)
    }

    async fn patch_status(&self, owner: &WeightsAndBiases) -> Result<WeightsAndBiases, ClusterError> {
        self.wrote();
        Ok(owner.clone())
    }

    async fn revert_deletion(&self, owner: &WeightsAndBiases) -> Result<WeightsAndBiases, ClusterError> {
        self.wrote();
        let mut updated = owner.clone();
        updated.metadata.deletion_timestamp = None;
        Ok(updated)
    }
}

/// A `WeightsAndBiases` named `wandb` in namespace `wandb`.
pub fn wandb(spec: WeightsAndBiasesSpec) -> WeightsAndBiases {
    let mut owner = WeightsAndBiases::new("wandb", spec);
    owner.metadata = ObjectMeta {
        name: Some("wandb".to_string()),
        namespace: Some("wandb".to_string()),
        uid: Some("0b8e6d3c-8f0e-4f55-b7a4-3c9a1e7d2f10".to_string()),
        generation: Some(1),
        ..Default::default()
    };
    owner
}

/// Reconcile until a pass makes no write. Panics if it never settles.
pub async fn reconcile_until_quiet(cluster: &MemoryCluster, owner: &mut WeightsAndBiases) {
    cluster.take_writes();
    for _ in 0..30 {
        let state = reconcile_wandb(cluster, owner).await;
        assert!(state.error().is_none(), "pass failed: {:?}", state.error());
        if cluster.take_writes() == 0 {
            return;
        }
    }
    panic!("reconciliation did not settle");
}
