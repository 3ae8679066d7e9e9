// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{ApiResource, DynamicObject, ListParams},
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use wandb_operator::{
    config::{init_tracing, OperatorConfig},
    constants::{KIND_WEIGHTS_AND_BIASES, TOKIO_WORKER_THREADS},
    context::Context,
    crd::WeightsAndBiases,
    labels::{K8S_MANAGED_BY, MANAGED_BY_WANDB_OPERATOR},
    metrics,
    reconcilers::{kinds::owned_kinds, reconcile_wandb},
};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ControllerError(#[from] anyhow::Error);

fn main() -> Result<()> {
    let config = OperatorConfig::parse();
    init_tracing(&config)?;

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("wandb-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    info!("Starting W&B infrastructure operator");
    debug!(
        log_format = ?config.log_format,
        requeue_secs = config.requeue_secs,
        error_requeue_secs = config.error_requeue_secs,
        "Logging initialized with file and line number tracking"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let metrics_addr = config.metrics_addr;
    let ctx = Arc::new(Context::new(client.clone(), config));

    // Neither task should ever exit; if one does, the process exits with it
    tokio::select! {
        result = run_wandb_controller(client, ctx) => {
            error!("CRITICAL: WeightsAndBiases controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("WeightsAndBiases controller exited")
        }
        result = run_metrics_server(metrics_addr) => {
            error!("CRITICAL: Metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
    }
}

/// Run the `WeightsAndBiases` controller
async fn run_wandb_controller(client: Client, ctx: Arc<Context>) -> Result<()> {
    let namespace = ctx.config.watch_namespace.clone();
    let (api, secrets) = match namespace.as_deref() {
        Some(namespace) => {
            info!("Starting WeightsAndBiases controller in namespace {}", namespace);
            (
                Api::<WeightsAndBiases>::namespaced(client.clone(), namespace),
                Api::<Secret>::namespaced(client.clone(), namespace),
            )
        }
        None => {
            info!("Starting WeightsAndBiases controller in all namespaces");
            (
                Api::<WeightsAndBiases>::all(client.clone()),
                Api::<Secret>::all(client.clone()),
            )
        }
    };

    // Everything the operator creates carries this label
    let owned = Config::default().labels(&format!("{K8S_MANAGED_BY}={MANAGED_BY_WANDB_OPERATOR}"));

    let mut controller = Controller::new(api, Config::default()).owns(secrets, owned.clone());
    for resource in installed_kinds(&client, namespace.as_deref()).await {
        let api = dynamic_api(&client, namespace.as_deref(), &resource);
        controller = controller.owns_with(api, resource, owned.clone());
    }

    controller
        .shutdown_on_signal()
        .run(reconcile_wandb_wrapper, error_policy, ctx)
        .for_each(|result| {
            match result {
                Ok((object, _)) => debug!("Reconciled {}/{}", object.namespace.unwrap_or_default(), object.name),
                Err(e) => warn!("Reconciliation error: {}", e),
            }
            futures::future::ready(())
        })
        .await;

    Ok(())
}

fn dynamic_api(client: &Client, namespace: Option<&str>, resource: &ApiResource) -> Api<DynamicObject> {
    match namespace {
        Some(namespace) => Api::namespaced_with(client.clone(), namespace, resource),
        None => Api::all_with(client.clone(), resource),
    }
}

/// Vendored kinds whose CRDs are served. A kind whose operator is missing is not
/// watched; its components still converge on the periodic requeue.
async fn installed_kinds(client: &Client, namespace: Option<&str>) -> Vec<ApiResource> {
    let mut installed = Vec::new();
    for kind in owned_kinds() {
        let resource = kind.api_resource();
        match dynamic_api(client, namespace, &resource)
            .list(&ListParams::default().limit(1))
            .await
        {
            Ok(_) => {
                debug!(kind = kind.kind, "Watching owned {}", kind.kind);
                installed.push(resource);
            }
            Err(e) => warn!(
                kind = kind.kind,
                "{} is not queryable, not watching it: {}. Is its operator installed?",
                kind.kind,
                e
            ),
        }
    }
    installed
}

/// Reconcile wrapper for `WeightsAndBiases`
async fn reconcile_wandb_wrapper(
    resource: Arc<WeightsAndBiases>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    let start = Instant::now();
    debug!(
        name = %resource.name_any(),
        namespace = ?resource.namespace(),
        "Reconcile wrapper called for WeightsAndBiases"
    );

    let mut owner = (*resource).clone();
    let state = reconcile_wandb(ctx.cluster.as_ref(), &mut owner).await;

    match state.to_result() {
        Ok(requeue) => {
            metrics::record_reconciliation_success(KIND_WEIGHTS_AND_BIASES, start.elapsed());
            let after = requeue.unwrap_or_else(|| ctx.config.requeue_interval());
            info!(
                "Successfully reconciled WeightsAndBiases: {}, requeueing in {}s",
                resource.name_any(),
                after.as_secs()
            );
            Ok(Action::requeue(after))
        }
        Err(e) => {
            metrics::record_reconciliation_error(KIND_WEIGHTS_AND_BIASES, start.elapsed());
            error!("Failed to reconcile WeightsAndBiases {}: {}", resource.name_any(), e);
            Err(anyhow::Error::from(e).into())
        }
    }
}

/// Error policy for the controller
fn error_policy(
    _resource: Arc<WeightsAndBiases>,
    _err: &ControllerError,
    ctx: Arc<Context>,
) -> Action {
    Action::requeue(ctx.config.error_requeue_interval())
}

/// Serve `/metrics` and `/healthz`
async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    let router = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Serving metrics on {}", addr);
    axum::serve(listener, router).await?;

    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
