// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pre-deletion backup executors.
//!
//! The deletion guard asks a component's [`BackupExecutor`] to back it up before its
//! finalizer is released. An executor is polled once per pass: it either reports a
//! terminal outcome (`Completed`, `Skipped`), reports `InProgress` with a re-check
//! delay, or fails.
//!
//! Only MySQL has a real executor ([`PerconaBackupExecutor`]); the other components
//! use [`PlaceholderBackupExecutor`], which completes immediately, or
//! [`NoOpBackupExecutor`], which records the backup as skipped.

use crate::cluster::{ClusterApi, CustomKind, ObjectKey};
use crate::constants::BACKUP_REQUEUE_SECS;
use crate::crd::{BackupPhase, BackupStatus, BackupStorageType, Component};
use crate::errors::ReconcileError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kube::api::DynamicObject;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Percona backup custom resource.
pub const PERCONA_BACKUP: CustomKind = CustomKind {
    group: "pxc.percona.com",
    version: "v1",
    kind: "PerconaXtraDBClusterBackup",
    plural: "perconaxtradbclusterbackups",
};

/// What to back up and what was recorded by earlier passes.
#[derive(Clone, Debug)]
pub struct BackupRequest {
    pub component: Component,
    pub namespace: String,
    /// Name of the component's primary object.
    pub cluster_name: String,
    pub storage_name: String,
    pub storage_type: BackupStorageType,
    pub timeout_seconds: i64,
    /// When deletion was requested; names the backup so every pass of one deletion
    /// refers to the same object.
    pub requested_at: DateTime<Utc>,
    /// Backup status recorded so far.
    pub previous: BackupStatus,
}

/// Non-failing outcome of one backup check.
#[derive(Clone, Debug, PartialEq)]
pub struct BackupResult {
    /// `InProgress`, `Completed` or `Skipped`.
    pub phase: BackupPhase,
    pub backup_name: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub message: String,
    /// When to check again while `InProgress`.
    pub requeue_after: Option<Duration>,
}

impl BackupResult {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, BackupPhase::Completed | BackupPhase::Skipped)
    }
}

/// Runs or polls a component backup.
#[async_trait]
pub trait BackupExecutor: Send + Sync {
    /// Start the backup, or report on the one already recorded in `request.previous`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backup failed, timed out, or could not be started.
    async fn run(
        &self,
        cluster: &dyn ClusterApi,
        request: &BackupRequest,
    ) -> Result<BackupResult, ReconcileError>;
}

fn backup_name(cluster_name: &str, now: DateTime<Utc>) -> String {
    format!("{cluster_name}-backup-{}", now.timestamp())
}

/// Completes immediately without moving any data.
///
/// Stands in for components whose operators offer no backup API this operator
/// drives yet (Kafka, MinIO, ClickHouse).
pub struct PlaceholderBackupExecutor;

#[async_trait]
impl BackupExecutor for PlaceholderBackupExecutor {
    async fn run(
        &self,
        _cluster: &dyn ClusterApi,
        request: &BackupRequest,
    ) -> Result<BackupResult, ReconcileError> {
        let now = Utc::now();
        info!(
            "Recording placeholder {} backup for {}/{}",
            request.component, request.namespace, request.cluster_name
        );
        Ok(BackupResult {
            phase: BackupPhase::Completed,
            backup_name: backup_name(&request.cluster_name, request.requested_at),
            started_at: Some(now.to_rfc3339()),
            completed_at: Some(now.to_rfc3339()),
            message: format!(
                "No {} backup engine is configured; deletion proceeds without a data copy",
                request.component
            ),
            requeue_after: None,
        })
    }
}

/// Records the backup as skipped.
pub struct NoOpBackupExecutor;

#[async_trait]
impl BackupExecutor for NoOpBackupExecutor {
    async fn run(
        &self,
        _cluster: &dyn ClusterApi,
        request: &BackupRequest,
    ) -> Result<BackupResult, ReconcileError> {
        debug!("Skipping {} backup", request.component);
        Ok(BackupResult {
            phase: BackupPhase::Skipped,
            backup_name: String::new(),
            started_at: None,
            completed_at: Some(Utc::now().to_rfc3339()),
            message: format!("{} does not support backups", request.component),
            requeue_after: None,
        })
    }
}

/// Backs up a Percona XtraDB cluster through a `PerconaXtraDBClusterBackup` object.
///
/// The first call creates the backup object; later calls poll its `status.state`
/// until it succeeds, fails, or exceeds the timeout. A backup object already named
/// for this deletion is resumed instead of created again.
pub struct PerconaBackupExecutor;

impl PerconaBackupExecutor {
    async fn start(
        cluster: &dyn ClusterApi,
        request: &BackupRequest,
    ) -> Result<BackupResult, ReconcileError> {
        let name = backup_name(&request.cluster_name, request.requested_at);
        let key = ObjectKey::custom(&PERCONA_BACKUP, &request.namespace, &name);

        if let Some(existing) = cluster.get_object(&key).await? {
            info!(
                "Resuming {} backup {}/{}",
                request.component, request.namespace, name
            );
            let started_at = existing
                .metadata
                .creation_timestamp
                .as_ref()
                .map_or(request.requested_at, |t| chrono::DateTime::from_timestamp_nanos(t.0.as_nanosecond() as i64));
            let previous = BackupStatus {
                backup_name: name,
                started_at: Some(started_at.to_rfc3339()),
                state: BackupPhase::InProgress,
                ..BackupStatus::default()
            };
            return Self::report(request, &previous, &existing);
        }

        let now = Utc::now();
        let object = key.new_object().data(json!({
            "spec": {
                "pxcCluster": request.cluster_name,
                "storageName": request.storage_name,
            }
        }));

        info!(
            "Starting {} backup {}/{} to storage {} ({})",
            request.component, request.namespace, name, request.storage_name, request.storage_type
        );
        cluster.create_object(&key, &object).await?;

        Ok(BackupResult {
            phase: BackupPhase::InProgress,
            backup_name: name,
            started_at: Some(now.to_rfc3339()),
            completed_at: None,
            message: "Backup started".to_string(),
            requeue_after: Some(Duration::from_secs(BACKUP_REQUEUE_SECS)),
        })
    }

    async fn poll(
        cluster: &dyn ClusterApi,
        request: &BackupRequest,
    ) -> Result<BackupResult, ReconcileError> {
        let previous = &request.previous;
        let key = ObjectKey::custom(&PERCONA_BACKUP, &request.namespace, &previous.backup_name);

        let Some(object) = cluster.get_object(&key).await? else {
            return Err(ReconcileError::BackupFailed {
                component: request.component,
                backup_name: previous.backup_name.clone(),
                reason: "backup object no longer exists".to_string(),
            });
        };
        Self::report(request, previous, &object)
    }

    /// Map the backup object's `status.state` to an outcome.
    fn report(
        request: &BackupRequest,
        previous: &BackupStatus,
        object: &DynamicObject,
    ) -> Result<BackupResult, ReconcileError> {
        let failed = |reason: String| ReconcileError::BackupFailed {
            component: request.component,
            backup_name: previous.backup_name.clone(),
            reason,
        };

        let state = object
            .data
            .pointer("/status/state")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        match state {
            "Succeeded" => Ok(BackupResult {
                phase: BackupPhase::Completed,
                backup_name: previous.backup_name.clone(),
                started_at: previous.started_at.clone(),
                completed_at: Some(Utc::now().to_rfc3339()),
                message: "Backup completed".to_string(),
                requeue_after: None,
            }),
            "Failed" | "Error" => Err(failed(format!("backup reported state {state}"))),
            _ => {
                let started = previous
                    .started_at
                    .as_deref()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|t| t.with_timezone(&Utc));
                if let Some(started) = started {
                    if (Utc::now() - started).num_seconds() > request.timeout_seconds {
                        return Err(ReconcileError::BackupTimedOut {
                            component: request.component,
                            backup_name: previous.backup_name.clone(),
                            timeout_seconds: request.timeout_seconds,
                        });
                    }
                }
                Ok(BackupResult {
                    phase: BackupPhase::InProgress,
                    backup_name: previous.backup_name.clone(),
                    started_at: previous.started_at.clone(),
                    completed_at: None,
                    message: if state.is_empty() {
                        "Backup pending".to_string()
                    } else {
                        format!("Backup {state}")
                    },
                    requeue_after: Some(Duration::from_secs(BACKUP_REQUEUE_SECS)),
                })
            }
        }
    }
}

#[async_trait]
impl BackupExecutor for PerconaBackupExecutor {
    async fn run(
        &self,
        cluster: &dyn ClusterApi,
        request: &BackupRequest,
    ) -> Result<BackupResult, ReconcileError> {
        let tracked = request.previous.state == BackupPhase::InProgress
            && !request.previous.backup_name.is_empty();
        if tracked {
            Self::poll(cluster, request).await
        } else {
            Self::start(cluster, request).await
        }
    }
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod backup_tests;
