// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label, annotation and finalizer constants.
//!
//! This module defines standard Kubernetes labels and W&B-specific finalizers
//! to ensure consistency across all objects created by the operator.

use crate::crd::Component;
use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture (e.g., "kafka")
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/part-of`
pub const PART_OF_WANDB: &str = "wandb";

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_WANDB_OPERATOR: &str = "wandb-operator";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer guarding the MySQL cluster until its backup has run
pub const FINALIZER_MYSQL: &str = "mysql.apps.wandb.com/finalizer";

/// Finalizer guarding the Redis objects
pub const FINALIZER_REDIS: &str = "redis.apps.wandb.com/finalizer";

/// Finalizer guarding the Kafka cluster until its backup has run
pub const FINALIZER_KAFKA: &str = "kafka.apps.wandb.com/finalizer";

/// Finalizer guarding the MinIO tenant until its backup has run
pub const FINALIZER_MINIO: &str = "minio.apps.wandb.com/finalizer";

/// Finalizer guarding the ClickHouse installation until its backup has run
pub const FINALIZER_CLICKHOUSE: &str = "clickhouse.apps.wandb.com/finalizer";

/// Finalizer owned by a component.
#[must_use]
pub fn finalizer_for(component: Component) -> &'static str {
    match component {
        Component::Mysql => FINALIZER_MYSQL,
        Component::Redis => FINALIZER_REDIS,
        Component::Kafka => FINALIZER_KAFKA,
        Component::Minio => FINALIZER_MINIO,
        Component::ClickHouse => FINALIZER_CLICKHOUSE,
    }
}

/// Labels stamped on every object created for a component.
///
/// # Arguments
///
/// * `component` - The component the object belongs to
/// * `instance` - Name of the owning `WeightsAndBiases` resource
#[must_use]
pub fn component_labels(component: Component, instance: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (K8S_COMPONENT.to_string(), component.key().to_string()),
        (K8S_INSTANCE.to_string(), instance.to_string()),
        (K8S_MANAGED_BY.to_string(), MANAGED_BY_WANDB_OPERATOR.to_string()),
        (K8S_PART_OF.to_string(), PART_OF_WANDB.to_string()),
    ])
}
