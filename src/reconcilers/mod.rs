// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation for `WeightsAndBiases` resources.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern, applied once per
//! infrastructure component:
//!
//! 1. **Guard** - Keep the component's finalizer and back up data before deletion
//! 2. **Observe** - Load the component's live objects into an actual snapshot
//! 3. **Compare** - Build the desired snapshot from spec and pick one drift action
//! 4. **Act** - Apply the action and record the transition in status
//!
//! After every component ran, the global phase and `Ready` condition are derived and
//! status is written when it changed.
//!
//! # Available Reconcilers
//!
//! - [`reconcile_wandb`] - Runs every component pipeline for one resource
//! - [`reconcile_component`] - Runs one component pipeline
//!
//! # Component Kinds
//!
//! [`kinds`] holds one [`component::ManagedKind`] per component, describing the
//! custom resources it renders, how it reports readiness and what it publishes in
//! its connection secret. [`backup`] holds the backup strategies used before
//! deletion.

pub mod backup;
pub mod component;
pub mod finalizers;
pub mod kinds;
pub mod state;
pub mod status;
pub mod wandb;

pub use component::reconcile_component;
pub use state::{ExitScope, ReconcileState};
pub use wandb::reconcile_wandb;
