// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! MySQL via the Percona XtraDB Cluster operator.

use super::{field, lifecycle_state, resources_json, service_host, volume_claim};
use crate::cluster::{CustomKind, ObjectKey};
use crate::constants::STATE_READY;
use crate::crd::{BackupStorageType, Component, DeploymentSize};
use crate::reconcilers::backup::{BackupExecutor, PerconaBackupExecutor};
use crate::reconcilers::component::{Layout, ManagedKind, ResolvedSpec, SizeDefaults, Snapshot};
use kube::api::DynamicObject;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

pub const PERCONA_CLUSTER: CustomKind = CustomKind {
    group: "pxc.percona.com",
    version: "v1",
    kind: "PerconaXtraDBCluster",
    plural: "perconaxtradbclusters",
};

pub const CLUSTER_NAME: &str = "wandb-mysql";

const CR_VERSION: &str = "1.18.0";
const PXC_IMAGE: &str = "percona/percona-xtradb-cluster:8.0";
const HAPROXY_IMAGE: &str = "percona/percona-xtradb-cluster-operator:1.18.0-haproxy";
const BACKUP_IMAGE: &str = "percona/percona-xtradb-cluster-operator:1.18.0-pxc8.0-backup";
const LOG_COLLECTOR_IMAGE: &str = "percona/percona-xtradb-cluster-operator:1.18.0-logcollector";
const PORT: &str = "3306";

pub struct MysqlKind;

/// Secret the Percona operator generates with the system user passwords.
#[must_use]
pub fn system_users_secret(cluster: &str) -> String {
    format!("{cluster}-secrets")
}

fn storage_entry(spec: &ResolvedSpec) -> Value {
    match spec.backup.storage_type {
        BackupStorageType::Filesystem => json!({
            "type": "filesystem",
            "volume": { "persistentVolumeClaim": volume_claim(&spec.storage_size) }
        }),
        BackupStorageType::S3 => json!({
            "type": "s3",
            "s3": {
                "bucket": spec.backup.storage_name,
                "credentialsSecret": format!("{}-backup-s3", spec.name),
            }
        }),
    }
}

impl ManagedKind for MysqlKind {
    fn component(&self) -> Component {
        Component::Mysql
    }

    fn defaults(&self, size: DeploymentSize) -> SizeDefaults {
        match size {
            DeploymentSize::Dev => SizeDefaults {
                storage_size: "1Gi",
                replicas: 1,
            },
            DeploymentSize::Small => SizeDefaults {
                storage_size: "10Gi",
                replicas: 3,
            },
        }
    }

    fn backup_storage(&self) -> &'static [BackupStorageType] {
        &[BackupStorageType::Filesystem, BackupStorageType::S3]
    }

    fn default_name(&self) -> &'static str {
        CLUSTER_NAME
    }

    fn layout_named(&self, namespace: &str, name: &str, _size: DeploymentSize) -> Layout {
        Layout {
            primary: ObjectKey::custom(&PERCONA_CLUSTER, namespace, name),
            dependent: None,
            secret_name: format!("{name}-connection"),
        }
    }

    fn render_primary(&self, spec: &ResolvedSpec, object: DynamicObject) -> DynamicObject {
        let clustered = spec.replicas > 1;
        let proxy_size = if clustered { spec.replicas } else { 0 };
        let mut body = json!({
            "crVersion": CR_VERSION,
            "secretsName": system_users_secret(&spec.name),
            "unsafeFlags": {
                "pxcSize": !clustered,
                "proxySize": !clustered,
                "tls": !clustered,
            },
            "tls": { "enabled": clustered },
            "pxc": {
                "size": spec.replicas,
                "image": PXC_IMAGE,
                "volumeSpec": { "persistentVolumeClaim": volume_claim(&spec.storage_size) },
                "configuration": "[mysqld]\npxc_strict_mode=PERMISSIVE\n",
            },
            "haproxy": {
                "enabled": clustered,
                "size": proxy_size,
                "image": HAPROXY_IMAGE,
            },
            "logcollector": {
                "enabled": !clustered,
                "image": LOG_COLLECTOR_IMAGE,
            },
        });

        if let Some(resources) = resources_json(spec.config.resources.as_ref()) {
            body["pxc"]["resources"] = resources;
        }

        if spec.backup.enabled {
            let mut storages = Map::new();
            storages.insert(spec.backup.storage_name.clone(), storage_entry(spec));
            body["backup"] = json!({
                "image": BACKUP_IMAGE,
                "storages": storages,
            });
        }

        object.data(json!({ "spec": body }))
    }

    fn is_ready(&self, actual: &Snapshot) -> bool {
        field(actual.primary(), "/status/state") == Some(STATE_READY)
    }

    fn status(&self, actual: &Snapshot) -> String {
        match field(actual.primary(), "/status/state") {
            Some(state) if actual.installed() && !state.is_empty() => state.to_string(),
            _ => lifecycle_state(actual, false),
        }
    }

    fn connection_info(&self, spec: &ResolvedSpec, _actual: &Snapshot) -> BTreeMap<String, String> {
        let service = if spec.replicas > 1 {
            format!("{}-haproxy", spec.name)
        } else {
            format!("{}-pxc", spec.name)
        };
        BTreeMap::from([
            ("MYSQL_HOST".to_string(), service_host(&service, &spec.namespace)),
            ("MYSQL_PORT".to_string(), PORT.to_string()),
            ("MYSQL_USER".to_string(), "root".to_string()),
            ("MYSQL_PASSWORD_SECRET".to_string(), system_users_secret(&spec.name)),
        ])
    }

    fn backup_executor(&self) -> &'static dyn BackupExecutor {
        &PerconaBackupExecutor
    }
}

#[cfg(test)]
#[path = "mysql_tests.rs"]
mod mysql_tests;
