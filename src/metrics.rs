// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the W&B operator.
//!
//! All metrics carry the namespace prefix `wandb_operator_`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Passes and their outcomes
//! - **Action Metrics** - Mutations chosen by the drift detector, per component
//! - **Backup Metrics** - Pre-deletion backup outcomes
//!
//! # Example
//!
//! ```rust,no_run
//! use wandb_operator::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("WeightsAndBiases", std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "wandb_operator";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register_counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let counter = CounterVec::new(Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help), labels)
        .expect("metric definition is valid");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric is registered once");
    counter
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (`WeightsAndBiases`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "reconciliations_total",
        "Total number of reconciliations by resource type and status",
        &["resource_type", "status"],
    )
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram =
        HistogramVec::new(opts, &["resource_type"]).expect("metric definition is valid");
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric is registered once");
    histogram
});

// ============================================================================
// Action Metrics
// ============================================================================

/// Total number of drift actions executed
///
/// Labels:
/// - `component`: Component key (e.g. `kafka`)
/// - `action`: Action name (e.g. `create_primary`)
/// - `status`: `success` or `error`
pub static ACTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "actions_total",
        "Total number of drift actions executed by component, action and status",
        &["component", "action", "status"],
    )
});

// ============================================================================
// Backup Metrics
// ============================================================================

/// Total number of pre-deletion backup checks by outcome
///
/// Labels:
/// - `component`: Component key
/// - `outcome`: `in_progress`, `completed`, `skipped`, `failed`
pub static BACKUPS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "backups_total",
        "Total number of pre-deletion backup checks by component and outcome",
        &["component", "outcome"],
    )
});

// ============================================================================
// Recording Helpers
// ============================================================================

/// Record a successful reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled
/// * `duration` - Duration of the reconciliation before failure
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record one executed drift action
pub fn record_action(component: &str, action: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    ACTIONS_TOTAL
        .with_label_values(&[component, action, status])
        .inc();
}

/// Record one backup check
pub fn record_backup(component: &str, outcome: &str) {
    BACKUPS_TOTAL.with_label_values(&[component, outcome]).inc();
}

/// Gather all metrics in Prometheus text format
///
/// # Errors
///
/// Returns an error if the metrics cannot be encoded.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
