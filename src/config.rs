// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! Every flag can also be set through its environment variable, so the operator
//! runs unchanged from a container spec or a developer shell:
//!
//! ```text
//! RUST_LOG=debug RUST_LOG_FORMAT=json wandb-operator --watch-namespace wandb
//! ```

use crate::constants::{DEFAULT_METRICS_ADDR, DEFAULT_REQUEUE_SECS, ERROR_REQUEUE_SECS};
use std::net::SocketAddr;
use std::time::Duration;

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable compact lines with ANSI colors.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Command line and environment configuration of the operator.
#[derive(Clone, Debug, clap::Parser)]
#[command(name = "wandb-operator", version, about)]
pub struct OperatorConfig {
    /// Tracing filter directive, e.g. `info` or `wandb_operator=debug,kube=warn`.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,

    #[arg(long, env = "RUST_LOG_FORMAT", value_enum, default_value = "text", ignore_case = true)]
    pub log_format: LogFormat,

    /// Requeue interval after a pass that gave no hint of its own.
    #[arg(long, env = "WANDB_REQUEUE_SECS", default_value_t = DEFAULT_REQUEUE_SECS)]
    pub requeue_secs: u64,

    /// Requeue interval after a failed pass.
    #[arg(long, env = "WANDB_ERROR_REQUEUE_SECS", default_value_t = ERROR_REQUEUE_SECS)]
    pub error_requeue_secs: u64,

    /// Bind address of the `/metrics` and `/healthz` endpoints.
    #[arg(long, env = "WANDB_METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: SocketAddr,

    /// Only watch `WeightsAndBiases` resources in this namespace.
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,
}

impl OperatorConfig {
    #[must_use]
    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_secs)
    }

    #[must_use]
    pub fn error_requeue_interval(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }
}

/// Install the global tracing subscriber.
///
/// Format: timestamp file:line LEVEL message, with thread names.
///
/// # Errors
///
/// Returns an error if the filter directive does not parse or a subscriber is
/// already installed.
pub fn init_tracing(config: &OperatorConfig) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_new(&config.log_filter)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_target(false);

    match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_ansi(true).compact().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
