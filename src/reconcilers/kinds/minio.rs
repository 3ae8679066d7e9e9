// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! MinIO via the MinIO operator's `Tenant`.
//!
//! The tenant reads its root credentials from a configuration secret, which is the
//! dependent object and is created first. The root password is generated once when
//! that secret is created and read back from it afterwards.

use super::{
    field, generate_password, int_field, lifecycle_state, resources_json, secret_value,
    service_host, volume_claim,
};
use crate::cluster::{CustomKind, ObjectKey};
use crate::crd::{BackupStorageType, Component, DeploymentSize};
use crate::reconcilers::backup::{BackupExecutor, PlaceholderBackupExecutor};
use crate::reconcilers::component::{Layout, ManagedKind, ResolvedSpec, SizeDefaults, Snapshot};
use kube::api::DynamicObject;
use serde_json::json;
use std::collections::BTreeMap;

pub const TENANT: CustomKind = CustomKind {
    group: "minio.min.io",
    version: "v2",
    kind: "Tenant",
    plural: "tenants",
};

pub const TENANT_NAME: &str = "wandb-minio";
pub const CONFIG_SECRET_KEY: &str = "config.env";
pub const ROOT_USER: &str = "admin";
const ROOT_PASSWORD_EXPORT: &str = "export MINIO_ROOT_PASSWORD=";

const IMAGE: &str = "quay.io/minio/minio:latest";
const SERVICE: &str = "minio";
const PORT: &str = "443";
const INITIALIZED: &str = "Initialized";

pub struct MinioKind;

fn config_secret_name(tenant: &str) -> String {
    format!("{tenant}-config")
}

/// Root password stored in the tenant's configuration secret.
fn root_password(actual: &Snapshot) -> Option<String> {
    secret_value(actual.dependent(), CONFIG_SECRET_KEY)?
        .lines()
        .find_map(|line| line.trim().strip_prefix(ROOT_PASSWORD_EXPORT))
        .filter(|p| !p.is_empty())
        .map(ToString::to_string)
}

fn volumes_per_server(size: DeploymentSize) -> i32 {
    match size {
        DeploymentSize::Dev => 1,
        DeploymentSize::Small => 4,
    }
}

impl ManagedKind for MinioKind {
    fn component(&self) -> Component {
        Component::Minio
    }

    fn defaults(&self, size: DeploymentSize) -> SizeDefaults {
        match size {
            DeploymentSize::Dev => SizeDefaults {
                storage_size: "10Gi",
                replicas: 1,
            },
            DeploymentSize::Small => SizeDefaults {
                storage_size: "10Gi",
                replicas: 3,
            },
        }
    }

    fn backup_storage(&self) -> &'static [BackupStorageType] {
        &[BackupStorageType::Filesystem]
    }

    fn default_name(&self) -> &'static str {
        TENANT_NAME
    }

    fn layout_named(&self, namespace: &str, name: &str, _size: DeploymentSize) -> Layout {
        Layout {
            primary: ObjectKey::custom(&TENANT, namespace, name),
            dependent: Some(ObjectKey::secret(namespace, &config_secret_name(name))),
            secret_name: format!("{name}-connection"),
        }
    }

    fn render_primary(&self, spec: &ResolvedSpec, object: DynamicObject) -> DynamicObject {
        let mut pool = json!({
            "name": "pool-0",
            "servers": spec.replicas,
            "volumesPerServer": volumes_per_server(spec.size),
            "volumeClaimTemplate": {
                "metadata": { "name": "data" },
                "spec": volume_claim(&spec.storage_size),
            },
        });
        if let Some(resources) = resources_json(spec.config.resources.as_ref()) {
            pool["resources"] = resources;
        }
        object.data(json!({
            "spec": {
                "image": IMAGE,
                "configuration": { "name": config_secret_name(&spec.name) },
                "requestAutoCert": true,
                "pools": [pool],
            }
        }))
    }

    fn render_dependent(&self, _spec: &ResolvedSpec, object: DynamicObject) -> Option<DynamicObject> {
        let password = generate_password();
        let config = format!(
            "export MINIO_ROOT_USER={ROOT_USER}\n{ROOT_PASSWORD_EXPORT}{password}\nexport MINIO_BROWSER=on\n"
        );
        Some(object.data(json!({
            "type": "Opaque",
            "stringData": { CONFIG_SECRET_KEY: config },
        })))
    }

    fn is_ready(&self, actual: &Snapshot) -> bool {
        int_field(actual.primary(), "/status/availableReplicas").unwrap_or(0) > 0
            && field(actual.primary(), "/status/currentState") == Some(INITIALIZED)
            && root_password(actual).is_some()
    }

    fn status(&self, actual: &Snapshot) -> String {
        let ready = self.is_ready(actual);
        match field(actual.primary(), "/status/currentState") {
            Some(state) if actual.installed() && !ready && !state.is_empty() => state.to_string(),
            _ => lifecycle_state(actual, ready),
        }
    }

    fn connection_info(&self, spec: &ResolvedSpec, actual: &Snapshot) -> BTreeMap<String, String> {
        let host = service_host(SERVICE, &spec.namespace);
        let mut info = BTreeMap::from([
            ("MINIO_ENDPOINT".to_string(), format!("https://{host}:{PORT}")),
            ("MINIO_HOST".to_string(), host),
            ("MINIO_PORT".to_string(), PORT.to_string()),
            ("MINIO_ACCESS_KEY".to_string(), ROOT_USER.to_string()),
            ("MINIO_CONFIG_SECRET_NAME".to_string(), config_secret_name(&spec.name)),
            ("MINIO_CONFIG_SECRET_KEY".to_string(), CONFIG_SECRET_KEY.to_string()),
        ]);
        if let Some(password) = root_password(actual) {
            info.insert("MINIO_SECRET_KEY".to_string(), password);
        }
        info
    }

    fn backup_executor(&self) -> &'static dyn BackupExecutor {
        &PlaceholderBackupExecutor
    }
}

#[cfg(test)]
#[path = "minio_tests.rs"]
mod minio_tests;
