// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! ClickHouse via the Altinity operator's `ClickHouseInstallation`.
//!
//! The application user's password lives in a credentials secret, the dependent
//! object. The installation only references the secret's SHA-256 key, so the
//! plain password never appears in its body.

use super::{
    field, generate_password, lifecycle_state, resources_json, secret_value, service_host,
    volume_claim,
};
use crate::cluster::{CustomKind, ObjectKey};
use crate::crd::{BackupStorageType, Component, DeploymentSize};
use crate::reconcilers::backup::{BackupExecutor, PlaceholderBackupExecutor};
use crate::reconcilers::component::{Layout, ManagedKind, ResolvedSpec, SizeDefaults, Snapshot};
use kube::api::DynamicObject;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const CLICKHOUSE_INSTALLATION: CustomKind = CustomKind {
    group: "clickhouse.altinity.com",
    version: "v1",
    kind: "ClickHouseInstallation",
    plural: "clickhouseinstallations",
};

pub const INSTALLATION_NAME: &str = "wandb-clickhouse";
pub const USER: &str = "wandb";
pub const PASSWORD_KEY: &str = "password";
pub const PASSWORD_HASH_KEY: &str = "password_sha256_hex";

const IMAGE: &str = "clickhouse/clickhouse-server";
const VOLUME_TEMPLATE: &str = "data";
const POD_TEMPLATE: &str = "default-pod";
const COMPLETED: &str = "Completed";

pub struct ClickHouseKind;

fn credentials_secret_name(installation: &str) -> String {
    format!("{installation}-credentials")
}

fn password(actual: &Snapshot) -> Option<String> {
    secret_value(actual.dependent(), PASSWORD_KEY).filter(|p| !p.is_empty())
}

impl ManagedKind for ClickHouseKind {
    fn component(&self) -> Component {
        Component::ClickHouse
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
        INSTALLATION_NAME
    }

    fn layout_named(&self, namespace: &str, name: &str, _size: DeploymentSize) -> Layout {
        Layout {
            primary: ObjectKey::custom(&CLICKHOUSE_INSTALLATION, namespace, name),
            dependent: Some(ObjectKey::secret(namespace, &credentials_secret_name(name))),
            secret_name: format!("{name}-connection"),
        }
    }

    fn render_primary(&self, spec: &ResolvedSpec, object: DynamicObject) -> DynamicObject {
        let mut body = json!({
            "configuration": {
                "users": {
                    format!("{USER}/k8s_secret_password_sha256_hex"):
                        format!("{}/{PASSWORD_HASH_KEY}", credentials_secret_name(&spec.name)),
                    format!("{USER}/networks/ip"): ["::/0"],
                },
                "clusters": [{
                    "name": "default",
                    "layout": { "shardsCount": 1, "replicasCount": spec.replicas },
                }],
            },
            "defaults": {
                "templates": { "dataVolumeClaimTemplate": VOLUME_TEMPLATE }
            },
            "templates": {
                "volumeClaimTemplates": [{
                    "name": VOLUME_TEMPLATE,
                    "spec": volume_claim(&spec.storage_size),
                }],
            },
        });

        let resources = resources_json(spec.config.resources.as_ref());
        if !spec.version.is_empty() || resources.is_some() {
            let mut container = json!({ "name": "clickhouse" });
            if !spec.version.is_empty() {
                container["image"] = json!(format!("{IMAGE}:{}", spec.version));
            }
            if let Some(resources) = resources {
                container["resources"] = resources;
            }
            body["templates"]["podTemplates"] = json!([{
                "name": POD_TEMPLATE,
                "spec": { "containers": [container] },
            }]);
            body["defaults"]["templates"]["podTemplate"] = json!(POD_TEMPLATE);
        }

        object.data(json!({ "spec": body }))
    }

    fn render_dependent(&self, _spec: &ResolvedSpec, object: DynamicObject) -> Option<DynamicObject> {
        let password = generate_password();
        let hash = format!("{:x}", Sha256::digest(password.as_bytes()));
        Some(object.data(json!({
            "type": "Opaque",
            "stringData": {
                PASSWORD_KEY: password,
                PASSWORD_HASH_KEY: hash,
            },
        })))
    }

    fn is_ready(&self, actual: &Snapshot) -> bool {
        field(actual.primary(), "/status/status") == Some(COMPLETED) && password(actual).is_some()
    }

    fn status(&self, actual: &Snapshot) -> String {
        let ready = self.is_ready(actual);
        match field(actual.primary(), "/status/status") {
            Some(state) if actual.installed() && !ready && !state.is_empty() && state != COMPLETED => {
                state.to_string()
            }
            _ => lifecycle_state(actual, ready),
        }
    }

    fn connection_info(&self, spec: &ResolvedSpec, actual: &Snapshot) -> BTreeMap<String, String> {
        let mut info = BTreeMap::from([
            (
                "CLICKHOUSE_HOST".to_string(),
                service_host(&format!("clickhouse-{}", spec.name), &spec.namespace),
            ),
            ("CLICKHOUSE_PORT".to_string(), "9000".to_string()),
            ("CLICKHOUSE_HTTP_PORT".to_string(), "8123".to_string()),
            ("CLICKHOUSE_USER".to_string(), USER.to_string()),
        ]);
        if let Some(password) = password(actual) {
            info.insert("CLICKHOUSE_PASSWORD".to_string(), password);
        }
        info
    }

    fn backup_executor(&self) -> &'static dyn BackupExecutor {
        &PlaceholderBackupExecutor
    }
}

#[cfg(test)]
#[path = "clickhouse_tests.rs"]
mod clickhouse_tests;
