// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for `WeightsAndBiases` resources.
//!
//! Each managed component owns one finalizer on the `WeightsAndBiases` resource
//! (see [`crate::labels::finalizer_for`]). The pure helpers compute the new list;
//! [`ensure_finalizer`] and [`remove_finalizer`] write it through the
//! [`ClusterApi`] and hand back the updated resource.
//!
//! # Example
//!
//! ```rust,ignore
//! use wandb_operator::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
//! use wandb_operator::labels::FINALIZER_KAFKA;
//!
//! async fn reconcile(cluster: &dyn ClusterApi, owner: WeightsAndBiases) -> Result<(), ClusterError> {
//!     let owner = ensure_finalizer(cluster, &owner, FINALIZER_KAFKA).await?;
//!
//!     if owner.metadata.deletion_timestamp.is_some() {
//!         // Back up and tear down, then release the resource
//!         remove_finalizer(cluster, &owner, FINALIZER_KAFKA).await?;
//!     }
//!     Ok(())
//! }
//! ```

use crate::cluster::ClusterApi;
use crate::crd::WeightsAndBiases;
use crate::errors::ClusterError;
use kube::ResourceExt;
use tracing::info;

/// `true` when `owner` carries `finalizer`.
#[must_use]
pub fn has_finalizer(owner: &WeightsAndBiases, finalizer: &str) -> bool {
    owner.finalizers().iter().any(|f| f == finalizer)
}

/// The owner's finalizers with `finalizer` appended, if missing.
#[must_use]
pub fn with_finalizer(owner: &WeightsAndBiases, finalizer: &str) -> Vec<String> {
    let mut finalizers = owner.finalizers().to_vec();
    if !finalizers.iter().any(|f| f == finalizer) {
        finalizers.push(finalizer.to_string());
    }
    finalizers
}

/// The owner's finalizers with every copy of `finalizer` removed.
#[must_use]
pub fn without_finalizer(owner: &WeightsAndBiases, finalizer: &str) -> Vec<String> {
    let mut finalizers = owner.finalizers().to_vec();
    finalizers.retain(|f| f != finalizer);
    finalizers
}

/// Add a finalizer to the owner if not already present.
///
/// The operation is idempotent: when the finalizer is already there no write is made
/// and a copy of `owner` is returned.
///
/// # Returns
///
/// The resource as stored after the write.
///
/// # Errors
///
/// Returns an error if the patch fails, including on a concurrent modification.
pub async fn ensure_finalizer(
    cluster: &dyn ClusterApi,
    owner: &WeightsAndBiases,
    finalizer: &str,
) -> Result<WeightsAndBiases, ClusterError> {
    if has_finalizer(owner, finalizer) {
        return Ok(owner.clone());
    }

    let namespace = owner.namespace().unwrap_or_default();
    let name = owner.name_any();
    info!("Adding finalizer {} to {}/{}", finalizer, namespace, name);

    let updated = cluster
        .patch_finalizers(owner, with_finalizer(owner, finalizer))
        .await?;

    info!(
        "Successfully added finalizer {} to {}/{}",
        finalizer, namespace, name
    );
    Ok(updated)
}

/// Remove a finalizer from the owner.
///
/// Idempotent in the same way as [`ensure_finalizer`].
///
/// # Errors
///
/// Returns an error if the patch fails, including on a concurrent modification.
pub async fn remove_finalizer(
    cluster: &dyn ClusterApi,
    owner: &WeightsAndBiases,
    finalizer: &str,
) -> Result<WeightsAndBiases, ClusterError> {
    if !has_finalizer(owner, finalizer) {
        return Ok(owner.clone());
    }

    let namespace = owner.namespace().unwrap_or_default();
    let name = owner.name_any();
    info!("Removing finalizer {} from {}/{}", finalizer, namespace, name);

    let updated = cluster
        .patch_finalizers(owner, without_finalizer(owner, finalizer))
        .await?;

    info!(
        "Successfully removed finalizer {} from {}/{}",
        finalizer, namespace, name
    );
    Ok(updated)
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
