// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for the `WeightsAndBiases` deployment resource.
//!
//! A single namespaced `WeightsAndBiases` object describes which infrastructure
//! components the operator should run for a W&B deployment and how they are sized.
//! The status subresource reports per-component progress and a global phase.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: apps.wandb.com/v2
//! kind: WeightsAndBiases
//! metadata:
//!   name: wandb
//!   namespace: wandb
//! spec:
//!   size: small
//!   mysql:
//!     enabled: true
//!     backup:
//!       enabled: true
//!       storageType: s3
//!   kafka:
//!     enabled: true
//!     storageSize: 20Gi
//!     config:
//!       replicationConfig:
//!         minInSyncReplicas: 1
//!   clickhouse:
//!     enabled: true
//!     name: analytics
//!     version: "25.3"
//! ```

use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size profile selecting storage and replica defaults for every component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentSize {
    /// Single replica, small volumes. Suitable for development clusters.
    #[default]
    Dev,
    /// Replicated, highly-available topology.
    Small,
}

impl fmt::Display for DeploymentSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dev => write!(f, "dev"),
            Self::Small => write!(f, "small"),
        }
    }
}

/// Where component backups are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BackupStorageType {
    #[default]
    Filesystem,
    S3,
}

impl fmt::Display for BackupStorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filesystem => write!(f, "filesystem"),
            Self::S3 => write!(f, "s3"),
        }
    }
}

/// Backup policy applied before a component is deleted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    /// Run a backup before the component is torn down.
    #[serde(default)]
    pub enabled: bool,

    /// Backup storage name understood by the vendored operator.
    /// Empty means `default-backup`.
    #[serde(default)]
    pub storage_name: String,

    /// Backup storage backend.
    #[serde(default)]
    pub storage_type: BackupStorageType,

    /// Seconds to wait for a backup before declaring it failed. 0 means 600.
    #[serde(default)]
    pub timeout_seconds: i64,
}

/// Settings shared by every managed infrastructure component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Whether the operator should run this component.
    #[serde(default)]
    pub enabled: bool,

    /// Persistent volume size (Kubernetes quantity). Empty means the size-profile default.
    #[serde(default)]
    pub storage_size: String,

    /// Replica count. 0 means the size-profile default.
    #[serde(default)]
    pub replicas: i32,

    /// Namespace for the component's objects. Empty means the resource's namespace.
    #[serde(default)]
    pub namespace: String,

    /// Name of the component's primary object; the names of its other objects
    /// derive from it. Empty means `wandb-<component>`.
    #[serde(default)]
    pub name: String,

    /// Server version. Only ClickHouse honors it; empty means the operator's default.
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub config: ComponentConfig,

    /// Redis Sentinel settings. Only Redis honors it; the sentinel topology itself
    /// follows the size profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentinel: Option<RedisSentinelSpec>,

    #[serde(default)]
    pub backup: BackupSpec,
}

/// Tuning passed through to the vendored operator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    /// Compute resources of the component's server pods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Topic replication settings. Only Kafka honors it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_config: Option<KafkaReplicationConfig>,
}

/// Kafka broker replication settings. 0 means derived from the replica count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaReplicationConfig {
    #[serde(default)]
    pub default_replication_factor: i32,

    #[serde(default)]
    pub min_in_sync_replicas: i32,

    #[serde(default, rename = "offsetsTopicRF")]
    pub offsets_topic_rf: i32,

    #[serde(default, rename = "transactionStateRF")]
    pub transaction_state_rf: i32,

    #[serde(default, rename = "transactionStateISR")]
    pub transaction_state_isr: i32,
}

/// Redis Sentinel settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedisSentinelSpec {
    /// Master group the sentinels monitor. Empty means `gorilla`.
    #[serde(default)]
    pub master_name: String,

    /// Compute resources of the sentinel pods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// `WeightsAndBiases` describes a complete W&B deployment and its infrastructure.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "apps.wandb.com",
    version = "v2",
    kind = "WeightsAndBiases",
    plural = "weightsandbiases",
    shortname = "wandb",
    namespaced,
    doc = "WeightsAndBiases is the top-level resource for a W&B deployment. It enables and sizes the MySQL, Redis, Kafka, MinIO and ClickHouse components the deployment depends on."
)]
#[kube(status = "WeightsAndBiasesStatus")]
#[kube(printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#)]
#[kube(printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#)]
#[serde(rename_all = "camelCase")]
pub struct WeightsAndBiasesSpec {
    /// Size profile used to default storage and replicas.
    #[serde(default)]
    pub size: DeploymentSize,

    #[serde(default)]
    pub mysql: ComponentSpec,

    #[serde(default)]
    pub redis: ComponentSpec,

    #[serde(default)]
    pub kafka: ComponentSpec,

    #[serde(default)]
    pub minio: ComponentSpec,

    #[serde(default)]
    pub clickhouse: ComponentSpec,
}

/// Global lifecycle phase of the deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DeploymentPhase {
    #[default]
    Pending,
    /// A component object was just created or deleted.
    InfraUpdate,
    Ready,
    /// A deletion is waiting on a backup.
    Deleting,
    /// A pre-deletion backup failed. Held until backups are disabled or succeed.
    DeletionPaused,
    Error,
}

impl fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::InfraUpdate => "InfraUpdate",
            Self::Ready => "Ready",
            Self::Deleting => "Deleting",
            Self::DeletionPaused => "DeletionPaused",
            Self::Error => "Error",
        };
        f.write_str(s)
    }
}

/// State of the most recent pre-deletion backup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BackupPhase {
    #[default]
    None,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

/// Backup bookkeeping recorded in a component's status.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub backup_name: String,

    /// RFC3339 timestamp the backup was started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,

    /// RFC3339 timestamp the backup reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,

    /// RFC3339 timestamp of the last recorded backup transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_backup_time: Option<String>,

    #[serde(default)]
    pub state: BackupPhase,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Seconds until the backup should be re-checked.
    #[serde(default)]
    pub requeue_after: i64,
}

/// Observed status of one component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    #[serde(default)]
    pub ready: bool,

    /// Status string projected from the component's objects (e.g. `ready`, `pending`).
    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub backup_status: BackupStatus,
}

/// Standard Kubernetes condition.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition, e.g. Ready.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// `WeightsAndBiases` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeightsAndBiasesStatus {
    #[serde(default)]
    pub state: DeploymentPhase,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub mysql: ComponentStatus,

    #[serde(default)]
    pub redis: ComponentStatus,

    #[serde(default)]
    pub kafka: ComponentStatus,

    #[serde(default)]
    pub minio: ComponentStatus,

    #[serde(default)]
    pub clickhouse: ComponentStatus,
}

/// The infrastructure components a `WeightsAndBiases` resource can enable,
/// in the order they are reconciled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    Mysql,
    Redis,
    Kafka,
    Minio,
    ClickHouse,
}

impl Component {
    /// All components in reconcile order.
    pub const ALL: [Component; 5] = [
        Component::Mysql,
        Component::Redis,
        Component::Kafka,
        Component::Minio,
        Component::ClickHouse,
    ];

    /// Lower-case identifier used in names, finalizers and labels.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Redis => "redis",
            Self::Kafka => "kafka",
            Self::Minio => "minio",
            Self::ClickHouse => "clickhouse",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mysql => "MySQL",
            Self::Redis => "Redis",
            Self::Kafka => "Kafka",
            Self::Minio => "MinIO",
            Self::ClickHouse => "ClickHouse",
        };
        f.write_str(s)
    }
}

impl WeightsAndBiasesSpec {
    /// Spec block for a component.
    #[must_use]
    pub fn component(&self, component: Component) -> &ComponentSpec {
        match component {
            Component::Mysql => &self.mysql,
            Component::Redis => &self.redis,
            Component::Kafka => &self.kafka,
            Component::Minio => &self.minio,
            Component::ClickHouse => &self.clickhouse,
        }
    }
}

impl WeightsAndBiasesStatus {
    #[must_use]
    pub fn component(&self, component: Component) -> &ComponentStatus {
        match component {
            Component::Mysql => &self.mysql,
            Component::Redis => &self.redis,
            Component::Kafka => &self.kafka,
            Component::Minio => &self.minio,
            Component::ClickHouse => &self.clickhouse,
        }
    }

    pub fn component_mut(&mut self, component: Component) -> &mut ComponentStatus {
        match component {
            Component::Mysql => &mut self.mysql,
            Component::Redis => &mut self.redis,
            Component::Kafka => &mut self.kafka,
            Component::Minio => &mut self.minio,
            Component::ClickHouse => &mut self.clickhouse,
        }
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
