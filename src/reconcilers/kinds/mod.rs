// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-component [`ManagedKind`] implementations.
//!
//! Each submodule describes one vendored operator's custom resources: their
//! identities, size-profile defaults, rendered bodies, readiness rules and the keys
//! published in the connection secret. The helpers here read the loosely-typed
//! status of those resources.

pub mod clickhouse;
pub mod kafka;
pub mod minio;
pub mod mysql;
pub mod redis;

use crate::cluster::CustomKind;
use crate::constants::{STATE_NOT_INSTALLED, STATE_PENDING, STATE_READY};
use crate::crd::Component;
use crate::reconcilers::component::{ManagedKind, Snapshot};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::api::DynamicObject;
use serde_json::{json, Value};

pub use clickhouse::ClickHouseKind;
pub use kafka::KafkaKind;
pub use minio::MinioKind;
pub use mysql::MysqlKind;
pub use redis::RedisKind;

/// Every managed kind, in reconcile order.
#[must_use]
pub fn all() -> [&'static dyn ManagedKind; 5] {
    [&MysqlKind, &RedisKind, &KafkaKind, &MinioKind, &ClickHouseKind]
}

/// Every vendored custom resource kind the operator creates.
#[must_use]
pub fn owned_kinds() -> [CustomKind; 8] {
    [
        mysql::PERCONA_CLUSTER,
        redis::REDIS_STANDALONE,
        redis::REDIS_REPLICATION,
        redis::REDIS_SENTINEL,
        kafka::KAFKA,
        kafka::KAFKA_NODE_POOL,
        minio::TENANT,
        clickhouse::CLICKHOUSE_INSTALLATION,
    ]
}

/// The kind managing `component`.
#[must_use]
pub fn for_component(component: Component) -> &'static dyn ManagedKind {
    match component {
        Component::Mysql => &MysqlKind,
        Component::Redis => &RedisKind,
        Component::Kafka => &KafkaKind,
        Component::Minio => &MinioKind,
        Component::ClickHouse => &ClickHouseKind,
    }
}

/// String at a JSON pointer inside an object's body.
pub(crate) fn field<'a>(object: Option<&'a DynamicObject>, pointer: &str) -> Option<&'a str> {
    object?.data.pointer(pointer)?.as_str()
}

/// Integer at a JSON pointer inside an object's body.
pub(crate) fn int_field(object: Option<&DynamicObject>, pointer: &str) -> Option<i64> {
    object?.data.pointer(pointer)?.as_i64()
}

/// The `status.conditions` entry of the given type.
pub(crate) fn condition<'a>(object: Option<&'a DynamicObject>, kind: &str) -> Option<&'a Value> {
    object?
        .data
        .pointer("/status/conditions")?
        .as_array()?
        .iter()
        .find(|c| c.get("type").and_then(Value::as_str) == Some(kind))
}

/// `true` when the condition of the given type has status `True`.
pub(crate) fn condition_true(object: Option<&DynamicObject>, kind: &str) -> bool {
    condition(object, kind)
        .and_then(|c| c.get("status"))
        .and_then(Value::as_str)
        == Some("True")
}

/// `NotInstalled`, `ready` or `pending`.
pub(crate) fn lifecycle_state(actual: &Snapshot, ready: bool) -> String {
    if !actual.installed() {
        STATE_NOT_INSTALLED.to_string()
    } else if ready {
        STATE_READY.to_string()
    } else {
        STATE_PENDING.to_string()
    }
}

/// In-cluster DNS name of a service.
pub(crate) fn service_host(service: &str, namespace: &str) -> String {
    format!("{service}.{namespace}.svc.cluster.local")
}

/// A fresh random credential, safe in env files and URLs.
pub(crate) fn generate_password() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 24]>())
}

/// Value stored under `key` in a secret read as a dynamic object.
///
/// Secrets read back from the API server carry base64 `data`; a secret this
/// operator rendered but the server has not normalized yet carries `stringData`.
pub(crate) fn secret_value(secret: Option<&DynamicObject>, key: &str) -> Option<String> {
    let body = &secret?.data;
    if let Some(encoded) = body.get("data").and_then(|d| d.get(key)).and_then(Value::as_str) {
        return STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok());
    }
    body.get("stringData")
        .and_then(|d| d.get(key))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

/// Configured pod resources as JSON, when set.
pub(crate) fn resources_json(resources: Option<&ResourceRequirements>) -> Option<Value> {
    resources.and_then(|r| serde_json::to_value(r).ok())
}

/// A `ReadWriteOnce` persistent volume claim spec requesting `storage`.
pub(crate) fn volume_claim(storage: &str) -> Value {
    json!({
        "accessModes": ["ReadWriteOnce"],
        "resources": { "requests": { "storage": storage } }
    })
}
