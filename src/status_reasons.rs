// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for `WeightsAndBiases` resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   state: InfraUpdate
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: ComponentsNotReady
//!       message: "Waiting for: Kafka, MinIO"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Encompassing readiness condition of the deployment
pub const CONDITION_TYPE_READY: &str = "Ready";

// ============================================================================
// Ready Condition Reasons
// ============================================================================

/// Every enabled component reports ready
pub const REASON_ALL_READY: &str = "AllReady";

/// At least one enabled component is still converging
pub const REASON_COMPONENTS_NOT_READY: &str = "ComponentsNotReady";

/// No component is enabled
pub const REASON_NO_COMPONENTS: &str = "NoComponentsEnabled";

/// The resource is being deleted and a backup is in flight
pub const REASON_DELETING: &str = "Deleting";

/// A pre-deletion backup failed and deletion is on hold
pub const REASON_DELETION_PAUSED: &str = "DeletionPaused";
