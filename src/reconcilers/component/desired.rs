// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired-state builder.
//!
//! Turns a component's spec block plus size-profile defaults into the snapshot the
//! component should converge to. Everything here is pure: the actual snapshot is
//! consulted only to decide whether the connection secret may be published yet.

use super::{component_name, component_namespace, ManagedKind, Snapshot};
use crate::constants::{DEFAULT_BACKUP_STORAGE_NAME, DEFAULT_BACKUP_TIMEOUT_SECS};
use crate::crd::{
    BackupSpec, BackupStorageType, Component, ComponentConfig, DeploymentSize, RedisSentinelSpec,
    WeightsAndBiases,
};
use crate::errors::ValidationError;
use crate::labels::component_labels;
use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use kube::ResourceExt;

/// Backup policy after defaulting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBackup {
    pub enabled: bool,
    pub storage_name: String,
    pub storage_type: BackupStorageType,
    pub timeout_seconds: i64,
}

/// A component's spec after defaults are applied and values validated.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSpec {
    pub component: Component,
    pub size: DeploymentSize,
    pub namespace: String,
    /// Name of the primary object.
    pub name: String,
    /// Name of the owning `WeightsAndBiases` resource.
    pub owner_name: String,
    pub storage_size: String,
    pub replicas: i32,
    /// Empty means the vendored operator's default.
    pub version: String,
    pub config: ComponentConfig,
    pub sentinel: Option<RedisSentinelSpec>,
    pub backup: ResolvedBackup,
}

/// Apply defaults to a component's spec and validate it.
///
/// Empty or zero fields take the size-profile default; set fields are kept.
///
/// # Errors
///
/// Returns a [`ValidationError`] when no namespace can be determined, the storage
/// size is not a positive quantity, replicas are negative, or backups are enabled
/// with an unsupported backend.
pub fn resolve(kind: &dyn ManagedKind, owner: &WeightsAndBiases) -> Result<ResolvedSpec, ValidationError> {
    let component = kind.component();
    let namespace = component_namespace(owner, component)?;
    let name = component_name(owner, kind);
    let spec = owner.spec.component(component);
    let defaults = kind.defaults(owner.spec.size);

    let storage_size = if spec.storage_size.trim().is_empty() {
        defaults.storage_size.to_string()
    } else {
        spec.storage_size.trim().to_string()
    };
    parse_quantity(&storage_size).map_err(|reason| ValidationError::InvalidStorageSize {
        component,
        value: storage_size.clone(),
        reason,
    })?;

    let replicas = match spec.replicas {
        r if r < 0 => {
            return Err(ValidationError::InvalidReplicas {
                component,
                replicas: r,
            })
        }
        0 => defaults.replicas,
        r => r,
    };

    if spec.backup.enabled {
        let supported = kind.backup_storage();
        if supported.is_empty() {
            return Err(ValidationError::BackupNotSupported { component });
        }
        if !supported.contains(&spec.backup.storage_type) {
            return Err(ValidationError::UnsupportedBackupStorage {
                component,
                storage_type: spec.backup.storage_type,
            });
        }
    }

    let backup = resolve_backup(&spec.backup);

    Ok(ResolvedSpec {
        component,
        size: owner.spec.size,
        namespace,
        name,
        owner_name: owner.name_any(),
        storage_size,
        replicas,
        version: spec.version.trim().to_string(),
        config: spec.config.clone(),
        sentinel: spec.sentinel.clone(),
        backup,
    })
}

/// Apply defaults to a backup policy without validating it against the component.
#[must_use]
pub fn resolve_backup(backup: &BackupSpec) -> ResolvedBackup {
    ResolvedBackup {
        enabled: backup.enabled,
        storage_name: if backup.storage_name.is_empty() {
            DEFAULT_BACKUP_STORAGE_NAME.to_string()
        } else {
            backup.storage_name.clone()
        },
        storage_type: backup.storage_type,
        timeout_seconds: if backup.timeout_seconds > 0 {
            backup.timeout_seconds
        } else {
            DEFAULT_BACKUP_TIMEOUT_SECS
        },
    }
}

/// Compute the desired snapshot of a component.
///
/// A disabled component is entirely absent regardless of what exists. An enabled
/// component wants its primary (and dependent, if any) installed; its connection
/// secret is wanted only once `actual` reports ready.
///
/// # Errors
///
/// Returns a [`ValidationError`] from [`resolve`].
pub fn build_desired(
    kind: &dyn ManagedKind,
    owner: &WeightsAndBiases,
    actual: &Snapshot,
) -> Result<Snapshot, ValidationError> {
    let component = kind.component();
    if !owner.spec.component(component).enabled {
        return Ok(Snapshot::absent());
    }

    let spec = resolve(kind, owner)?;
    let layout = kind.layout_named(&spec.namespace, &spec.name, spec.size);
    let labels = component_labels(component, &spec.owner_name);

    let mut primary = kind.render_primary(&spec, layout.primary.new_object());
    primary.labels_mut().extend(labels.clone());
    let mut desired = Snapshot::absent().with_primary(primary);

    if let Some(key) = &layout.dependent {
        if let Some(mut dependent) = kind.render_dependent(&spec, key.new_object()) {
            dependent.labels_mut().extend(labels.clone());
            desired = desired.with_dependent(dependent);
        }
    }

    if kind.is_ready(actual) {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(layout.secret_name.clone()),
                namespace: Some(spec.namespace.clone()),
                labels: Some(labels),
                ..Default::default()
            },
            string_data: Some(kind.connection_info(&spec, actual)),
            type_: Some("Opaque".to_string()),
            ..Default::default()
        };
        desired = desired.with_secret(secret);
    }

    Ok(desired)
}

/// Parse a Kubernetes resource quantity into bytes.
///
/// Accepts a non-negative decimal number with an optional binary (`Ki`..`Ei`),
/// decimal (`k`..`E`) or exponent (`e3`) suffix. The result must be greater than zero.
///
/// # Errors
///
/// Returns a human-readable reason when the value is malformed or zero.
pub fn parse_quantity(value: &str) -> Result<f64, String> {
    const SUFFIXES: [(&str, f64); 12] = [
        ("Ki", 1024.0),
        ("Mi", 1_048_576.0),
        ("Gi", 1_073_741_824.0),
        ("Ti", 1_099_511_627_776.0),
        ("Pi", 1_125_899_906_842_624.0),
        ("Ei", 1_152_921_504_606_846_976.0),
        ("k", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
        ("P", 1e15),
        ("E", 1e18),
    ];

    if value.is_empty() {
        return Err("quantity is empty".to_string());
    }

    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, suffix) = value.split_at(split);

    if number.is_empty() || number.matches('.').count() > 1 || number == "." {
        return Err(format!("'{number}' is not a number"));
    }
    let base: f64 = number
        .parse()
        .map_err(|_| format!("'{number}' is not a number"))?;

    let multiplier = if suffix.is_empty() {
        1.0
    } else if let Some((_, m)) = SUFFIXES.iter().find(|(s, _)| *s == suffix) {
        *m
    } else if let Some(exp) = suffix.strip_prefix(['e', 'E']) {
        let exp: i32 = exp
            .parse()
            .map_err(|_| format!("unknown suffix '{suffix}'"))?;
        10f64.powi(exp)
    } else {
        return Err(format!("unknown suffix '{suffix}'"));
    };

    let bytes = base * multiplier;
    if bytes <= 0.0 {
        return Err("quantity must be greater than zero".to_string());
    }
    Ok(bytes)
}

#[cfg(test)]
#[path = "desired_tests.rs"]
mod desired_tests;
