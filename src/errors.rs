// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the W&B operator.
//!
//! This module provides structured errors for:
//! - Cluster API requests (reads, writes, optimistic-concurrency conflicts)
//! - Spec validation (storage quantities, replica counts, backup storage types)
//! - Pre-deletion backups
//!
//! "Not found" is deliberately absent: absence is a valid snapshot state and
//! never surfaces as an error.

use crate::crd::{BackupStorageType, Component};
use thiserror::Error;

/// Errors returned by the cluster API collaborator.
#[derive(Error, Debug, Clone)]
pub enum ClusterError {
    /// A request failed for a reason other than absence.
    ///
    /// Transient: the pass fails and is retried with backoff.
    #[error("Failed to {verb} {kind} '{namespace}/{name}': {reason}")]
    Request {
        /// The API verb (get, create, delete, patch)
        verb: &'static str,
        /// Kind of the object
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
        /// Error reported by the API server or transport
        reason: String,
    },

    /// A write was rejected because the object changed since it was read.
    #[error("{kind} '{namespace}/{name}' was modified concurrently; retrying from a fresh read")]
    Conflict {
        /// Kind of the object
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
    },

    /// An object could not be converted to its wire form.
    #[error("Failed to encode {kind} '{name}': {reason}")]
    Serialization {
        /// Kind of the object
        kind: String,
        /// Name of the object
        name: String,
        /// Serializer error
        reason: String,
    },
}

/// Errors found while turning a component spec into a desired snapshot.
///
/// Validation errors never resolve on their own: the pass fails on every retry
/// until the spec is corrected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `storageSize` is not a valid Kubernetes quantity.
    #[error("Invalid storage size '{value}' for {component}: {reason}")]
    InvalidStorageSize {
        component: Component,
        value: String,
        reason: String,
    },

    /// `replicas` is negative.
    #[error("Invalid replica count {replicas} for {component}: must be greater than zero")]
    InvalidReplicas { component: Component, replicas: i32 },

    /// The backup storage backend is not supported by the component's operator.
    #[error("Unsupported backup storage type '{storage_type}' for {component}")]
    UnsupportedBackupStorage {
        component: Component,
        storage_type: BackupStorageType,
    },

    /// The component has no backup support at all.
    #[error("Backups are not supported for {component}; disable backup to continue")]
    BackupNotSupported { component: Component },

    /// Neither the component nor the owning resource names a namespace.
    #[error("No namespace for {component}: set one on the component or the resource")]
    MissingNamespace { component: Component },
}

/// Errors that fail a reconcile pass.
#[derive(Error, Debug, Clone)]
pub enum ReconcileError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backup executor reported a failure.
    #[error("{component} backup '{backup_name}' failed: {reason}")]
    BackupFailed {
        component: Component,
        backup_name: String,
        reason: String,
    },

    /// The backup did not reach a terminal state in time.
    #[error("{component} backup '{backup_name}' did not complete within {timeout_seconds}s")]
    BackupTimedOut {
        component: Component,
        backup_name: String,
        timeout_seconds: i64,
    },

    /// A `ReconcileState` was converted before any unit of work settled it.
    #[error("returning undone reconcile result")]
    Undone,
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
