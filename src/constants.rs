// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the W&B operator.
//!
//! This module contains the numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group of the `WeightsAndBiases` CRD
pub const API_GROUP: &str = "apps.wandb.com";

/// API version of the `WeightsAndBiases` CRD
pub const API_VERSION: &str = "v2";

/// Kind name for the `WeightsAndBiases` resource
pub const KIND_WEIGHTS_AND_BIASES: &str = "WeightsAndBiases";

/// Field manager recorded on writes made by this operator
pub const FIELD_MANAGER: &str = "wandb-operator";

// ============================================================================
// Requeue Constants
// ============================================================================

/// Requeue interval once a pass finishes without asking for anything sooner (2 minutes)
pub const DEFAULT_REQUEUE_SECS: u64 = 120;

/// Requeue interval after a failed pass (30 seconds)
pub const ERROR_REQUEUE_SECS: u64 = 30;

/// Re-check interval while a pre-deletion backup is running, when the executor gives none
pub const BACKUP_REQUEUE_SECS: u64 = 30;

// ============================================================================
// Backup Constants
// ============================================================================

/// Backup timeout used when `timeoutSeconds` is 0 (10 minutes)
pub const DEFAULT_BACKUP_TIMEOUT_SECS: i64 = 600;

/// Storage name used when `storageName` is empty
pub const DEFAULT_BACKUP_STORAGE_NAME: &str = "default-backup";

// ============================================================================
// Status String Constants
// ============================================================================

/// Component state string for a component with no primary object
pub const STATE_NOT_INSTALLED: &str = "NotInstalled";

/// Component state string once a component reports ready
pub const STATE_READY: &str = "ready";

/// Component state string while a component converges
pub const STATE_PENDING: &str = "pending";

/// Component state string while a component is being removed
pub const STATE_STOPPING: &str = "stopping";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of tokio worker threads
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default bind address of the metrics and health endpoint
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";
