// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kafka via Strimzi, in KRaft mode with a single node pool.
//!
//! The `KafkaNodePool` is the dependent: Strimzi only schedules brokers for a
//! `Kafka` annotated with node pools once a pool labelled with its name exists.

use super::{condition, condition_true, int_field, resources_json, service_host};
use crate::cluster::{CustomKind, ObjectKey};
use crate::constants::{STATE_NOT_INSTALLED, STATE_PENDING, STATE_READY};
use crate::crd::{BackupStorageType, Component, DeploymentSize};
use crate::reconcilers::backup::{BackupExecutor, PlaceholderBackupExecutor};
use crate::reconcilers::component::{Layout, ManagedKind, ResolvedSpec, SizeDefaults, Snapshot};
use kube::api::DynamicObject;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const GROUP: &str = "kafka.strimzi.io";
const VERSION: &str = "v1beta2";

pub const KAFKA: CustomKind = CustomKind {
    group: GROUP,
    version: VERSION,
    kind: "Kafka",
    plural: "kafkas",
};

pub const KAFKA_NODE_POOL: CustomKind = CustomKind {
    group: GROUP,
    version: VERSION,
    kind: "KafkaNodePool",
    plural: "kafkanodepools",
};

pub const CLUSTER_NAME: &str = "wandb-kafka";

const KAFKA_VERSION: &str = "4.1.0";
const METADATA_VERSION: &str = "4.1-IV0";
const LISTENER: &str = "plain";
const PORT: u16 = 9092;

pub const ANNOTATION_NODE_POOLS: &str = "strimzi.io/node-pools";
pub const ANNOTATION_KRAFT: &str = "strimzi.io/kraft";
pub const LABEL_CLUSTER: &str = "strimzi.io/cluster";

pub struct KafkaKind;

/// Broker replication settings, configured values winning over the replica count.
fn broker_config(spec: &ResolvedSpec) -> Value {
    let configured = spec.config.replication_config.unwrap_or_default();
    let pick = |value: i32, derived: i32| if value > 0 { value } else { derived };
    let replicas = spec.replicas;
    let min_isr = replicas.min(2);

    json!({
        "offsets.topic.replication.factor": pick(configured.offsets_topic_rf, replicas),
        "transaction.state.log.replication.factor": pick(configured.transaction_state_rf, replicas),
        "transaction.state.log.min.isr": pick(configured.transaction_state_isr, min_isr),
        "default.replication.factor": pick(configured.default_replication_factor, replicas),
        "min.insync.replicas": pick(configured.min_in_sync_replicas, min_isr),
    })
}

fn node_pool_ready(pool: Option<&DynamicObject>) -> bool {
    if pool.is_none() {
        return false;
    }
    if condition(pool, "Ready").is_some() {
        return condition_true(pool, "Ready");
    }
    int_field(pool, "/status/replicas").unwrap_or(0) > 0
        && int_field(pool, "/status/observedGeneration").unwrap_or(0) > 0
}

/// Bootstrap address reported by Strimzi for the plain listener.
fn reported_bootstrap(kafka: Option<&DynamicObject>) -> Option<String> {
    kafka?
        .data
        .pointer("/status/listeners")?
        .as_array()?
        .iter()
        .find(|l| l.get("name").and_then(Value::as_str) == Some(LISTENER))?
        .get("bootstrapServers")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

impl ManagedKind for KafkaKind {
    fn component(&self) -> Component {
        Component::Kafka
    }

    fn defaults(&self, size: DeploymentSize) -> SizeDefaults {
        match size {
            DeploymentSize::Dev => SizeDefaults {
                storage_size: "1Gi",
                replicas: 1,
            },
            DeploymentSize::Small => SizeDefaults {
                storage_size: "5Gi",
                replicas: 3,
            },
        }
    }

    fn backup_storage(&self) -> &'static [BackupStorageType] {
        &[BackupStorageType::Filesystem]
    }

    fn default_name(&self) -> &'static str {
        CLUSTER_NAME
    }

    fn layout_named(&self, namespace: &str, name: &str, _size: DeploymentSize) -> Layout {
        Layout {
            primary: ObjectKey::custom(&KAFKA, namespace, name),
            dependent: Some(ObjectKey::custom(&KAFKA_NODE_POOL, namespace, &format!("{name}-pool"))),
            secret_name: format!("{name}-connection"),
        }
    }

    fn render_primary(&self, spec: &ResolvedSpec, mut object: DynamicObject) -> DynamicObject {
        object.metadata.annotations = Some(BTreeMap::from([
            (ANNOTATION_NODE_POOLS.to_string(), "enabled".to_string()),
            (ANNOTATION_KRAFT.to_string(), "enabled".to_string()),
        ]));

        object.data(json!({
            "spec": {
                "kafka": {
                    "version": KAFKA_VERSION,
                    "metadataVersion": METADATA_VERSION,
                    "listeners": [{
                        "name": LISTENER,
                        "port": PORT,
                        "type": "internal",
                        "tls": false,
                    }],
                    "config": broker_config(spec),
                },
                "entityOperator": {
                    "topicOperator": {},
                    "userOperator": {},
                },
            }
        }))
    }

    fn render_dependent(&self, spec: &ResolvedSpec, mut object: DynamicObject) -> Option<DynamicObject> {
        object
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(LABEL_CLUSTER.to_string(), spec.name.clone());

        let mut body = json!({
            "replicas": spec.replicas,
            "roles": ["controller", "broker"],
            "storage": {
                "type": "jbod",
                "volumes": [{
                    "id": 0,
                    "type": "persistent-claim",
                    "size": spec.storage_size,
                    "deleteClaim": false,
                    "kraftMetadata": "shared",
                }],
            },
        });
        if let Some(resources) = resources_json(spec.config.resources.as_ref()) {
            body["resources"] = resources;
        }
        Some(object.data(json!({ "spec": body })))
    }

    fn is_ready(&self, actual: &Snapshot) -> bool {
        condition_true(actual.primary(), "Ready") && node_pool_ready(actual.dependent())
    }

    fn status(&self, actual: &Snapshot) -> String {
        if !actual.installed() {
            return STATE_NOT_INSTALLED.to_string();
        }
        if self.is_ready(actual) {
            return STATE_READY.to_string();
        }
        condition(actual.primary(), "Ready")
            .and_then(|c| c.get("reason"))
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .map_or_else(|| STATE_PENDING.to_string(), |r| format!("Kafka:{r}"))
    }

    fn connection_info(&self, spec: &ResolvedSpec, actual: &Snapshot) -> BTreeMap<String, String> {
        let host = service_host(&format!("{}-kafka-bootstrap", spec.name), &spec.namespace);
        let bootstrap =
            reported_bootstrap(actual.primary()).unwrap_or_else(|| format!("{host}:{PORT}"));
        BTreeMap::from([
            ("KAFKA_BOOTSTRAP_SERVERS".to_string(), bootstrap),
            ("KAFKA_HOST".to_string(), host),
            ("KAFKA_PORT".to_string(), PORT.to_string()),
        ])
    }

    fn backup_executor(&self) -> &'static dyn BackupExecutor {
        &PlaceholderBackupExecutor
    }
}

#[cfg(test)]
#[path = "kafka_tests.rs"]
mod kafka_tests;
