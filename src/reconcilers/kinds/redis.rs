// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Redis via the Opstree redis operator.
//!
//! `dev` runs a standalone `Redis`. `small` runs a `RedisReplication` behind a
//! `RedisSentinel`; the replication is the dependent and must exist before the
//! sentinel that monitors it. The component's `sentinel` block tunes the sentinels
//! but never switches the topology.

use super::{lifecycle_state, resources_json, service_host, volume_claim};
use crate::cluster::{CustomKind, ObjectKey};
use crate::crd::{BackupStorageType, Component, DeploymentSize};
use crate::reconcilers::backup::{BackupExecutor, NoOpBackupExecutor};
use crate::reconcilers::component::{Layout, ManagedKind, ResolvedSpec, SizeDefaults, Snapshot};
use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::api::DynamicObject;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const GROUP: &str = "redis.redis.opstreelabs.in";
const VERSION: &str = "v1beta2";

pub const REDIS_STANDALONE: CustomKind = CustomKind {
    group: GROUP,
    version: VERSION,
    kind: "Redis",
    plural: "redis",
};

pub const REDIS_REPLICATION: CustomKind = CustomKind {
    group: GROUP,
    version: VERSION,
    kind: "RedisReplication",
    plural: "redisreplications",
};

pub const REDIS_SENTINEL: CustomKind = CustomKind {
    group: GROUP,
    version: VERSION,
    kind: "RedisSentinel",
    plural: "redissentinels",
};

pub const REDIS_NAME: &str = "wandb-redis";
pub const MASTER_GROUP: &str = "gorilla";

const REDIS_IMAGE: &str = "quay.io/opstree/redis:v7.0.15";
const SENTINEL_IMAGE: &str = "quay.io/opstree/redis-sentinel:v7.0.12";

pub struct RedisKind;

fn kubernetes_config(image: &str, resources: Option<&ResourceRequirements>) -> Value {
    let mut config = json!({ "image": image, "imagePullPolicy": "IfNotPresent" });
    if let Some(resources) = resources_json(resources) {
        config["resources"] = resources;
    }
    config
}

fn sentinel_name(name: &str) -> String {
    format!("{name}-sentinel")
}

fn master_group(spec: &ResolvedSpec) -> &str {
    spec.sentinel
        .as_ref()
        .map(|s| s.master_name.trim())
        .filter(|m| !m.is_empty())
        .unwrap_or(MASTER_GROUP)
}

fn is_sentinel(actual: &Snapshot) -> bool {
    actual
        .primary()
        .and_then(|p| p.types.as_ref())
        .is_some_and(|t| t.kind == REDIS_SENTINEL.kind)
}

impl ManagedKind for RedisKind {
    fn component(&self) -> Component {
        Component::Redis
    }

    fn defaults(&self, size: DeploymentSize) -> SizeDefaults {
        match size {
            DeploymentSize::Dev => SizeDefaults {
                storage_size: "100Mi",
                replicas: 1,
            },
            DeploymentSize::Small => SizeDefaults {
                storage_size: "2Gi",
                replicas: 3,
            },
        }
    }

    fn backup_storage(&self) -> &'static [BackupStorageType] {
        &[]
    }

    fn default_name(&self) -> &'static str {
        REDIS_NAME
    }

    fn layout_named(&self, namespace: &str, name: &str, size: DeploymentSize) -> Layout {
        let secret_name = format!("{name}-connection");
        match size {
            DeploymentSize::Dev => Layout {
                primary: ObjectKey::custom(&REDIS_STANDALONE, namespace, name),
                dependent: None,
                secret_name,
            },
            DeploymentSize::Small => Layout {
                primary: ObjectKey::custom(&REDIS_SENTINEL, namespace, &sentinel_name(name)),
                dependent: Some(ObjectKey::custom(&REDIS_REPLICATION, namespace, name)),
                secret_name,
            },
        }
    }

    fn render_primary(&self, spec: &ResolvedSpec, object: DynamicObject) -> DynamicObject {
        let body = match spec.size {
            DeploymentSize::Dev => json!({
                "kubernetesConfig": kubernetes_config(REDIS_IMAGE, spec.config.resources.as_ref()),
                "storage": {
                    "volumeClaimTemplate": { "spec": volume_claim(&spec.storage_size) }
                },
            }),
            DeploymentSize::Small => json!({
                "clusterSize": spec.replicas,
                "kubernetesConfig": kubernetes_config(
                    SENTINEL_IMAGE,
                    spec.sentinel.as_ref().and_then(|s| s.resources.as_ref()),
                ),
                "redisSentinelConfig": {
                    "redisReplicationName": spec.name,
                    "masterGroupName": master_group(spec),
                },
            }),
        };
        object.data(json!({ "spec": body }))
    }

    fn render_dependent(&self, spec: &ResolvedSpec, object: DynamicObject) -> Option<DynamicObject> {
        if spec.size != DeploymentSize::Small {
            return None;
        }
        Some(object.data(json!({
            "spec": {
                "clusterSize": spec.replicas,
                "kubernetesConfig": kubernetes_config(REDIS_IMAGE, spec.config.resources.as_ref()),
                "storage": {
                    "volumeClaimTemplate": { "spec": volume_claim(&spec.storage_size) }
                },
            }
        })))
    }

    /// The redis operator publishes no readiness; installed objects count as ready.
    fn is_ready(&self, actual: &Snapshot) -> bool {
        if is_sentinel(actual) {
            actual.installed() && actual.dependent_installed()
        } else {
            actual.installed()
        }
    }

    fn status(&self, actual: &Snapshot) -> String {
        lifecycle_state(actual, self.is_ready(actual))
    }

    fn connection_info(&self, spec: &ResolvedSpec, _actual: &Snapshot) -> BTreeMap<String, String> {
        match spec.size {
            DeploymentSize::Dev => BTreeMap::from([
                ("REDIS_HOST".to_string(), service_host(&spec.name, &spec.namespace)),
                ("REDIS_PORT".to_string(), "6379".to_string()),
            ]),
            DeploymentSize::Small => BTreeMap::from([
                (
                    "REDIS_SENTINEL_HOST".to_string(),
                    service_host(&sentinel_name(&spec.name), &spec.namespace),
                ),
                ("REDIS_SENTINEL_PORT".to_string(), "26379".to_string()),
                ("REDIS_MASTER_NAME".to_string(), master_group(spec).to_string()),
            ]),
        }
    }

    fn backup_executor(&self) -> &'static dyn BackupExecutor {
        &NoOpBackupExecutor
    }
}

#[cfg(test)]
#[path = "redis_tests.rs"]
mod redis_tests;
