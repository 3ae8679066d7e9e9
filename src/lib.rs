// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # wandb-operator - Weights & Biases infrastructure operator for Kubernetes
//!
//! The operator watches `WeightsAndBiases` resources and keeps the infrastructure a
//! W&B deployment depends on converged: MySQL, Redis, Kafka, MinIO and ClickHouse,
//! each delegated to its own upstream operator through custom resources.
//!
//! ## Overview
//!
//! - Every component runs through the same pipeline: deletion guard, desired and
//!   actual snapshots, one drift action per pass
//! - Each component publishes its connection details in a `Secret`
//! - A finalizer per component lets data be backed up before deletion
//! - Status reports a per-component block, a global phase and a `Ready` condition
//!
//! ## Modules
//!
//! - [`crd`] - The `WeightsAndBiases` custom resource
//! - [`reconcilers`] - Reconciliation pipeline, component kinds and backups
//! - [`cluster`] - Cluster access behind the [`cluster::ClusterApi`] trait
//! - [`config`] - Command line and environment configuration
//! - [`context`] - Shared controller context
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use wandb_operator::crd::{DeploymentSize, WeightsAndBiasesSpec};
//!
//! let mut spec = WeightsAndBiasesSpec {
//!     size: DeploymentSize::Small,
//!     ..Default::default()
//! };
//! spec.mysql.enabled = true;
//! spec.redis.enabled = true;
//! ```

pub mod cluster;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod status_reasons;
