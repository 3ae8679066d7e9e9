// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared controller context.
//!
//! One [`Context`] is created at startup and handed to every reconciliation through
//! an `Arc`. It carries the cluster access used by the reconcilers and the operator
//! configuration that shapes requeue behavior.

use crate::cluster::{ClusterApi, KubeClusterApi};
use crate::config::OperatorConfig;
use kube::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct Context {
    /// Cluster access for all component objects and the owner resource
    pub cluster: Arc<dyn ClusterApi>,

    /// Operator configuration
    pub config: OperatorConfig,
}

impl Context {
    /// Build a context backed by a live Kubernetes client.
    #[must_use]
    pub fn new(client: Client, config: OperatorConfig) -> Self {
        Self::with_cluster(Arc::new(KubeClusterApi::new(client)), config)
    }

    /// Build a context around any [`ClusterApi`] implementation.
    #[must_use]
    pub fn with_cluster(cluster: Arc<dyn ClusterApi>, config: OperatorConfig) -> Self {
        Self { cluster, config }
    }
}
