//! Namespace provisioner

use rollout_core::{NameKind, validate_name};

use crate::error::{Result, RolloutError};
use crate::ops::{ClusterOps, NamespaceOutcome};

/// Make sure `name` exists, creating it only when absent
///
/// Idempotent: an existing namespace is reported as `AlreadyExists`
/// without a create call. A create that loses a race with another actor
/// also reports `AlreadyExists`.
pub async fn ensure_namespace<O: ClusterOps + ?Sized>(
    ops: &O,
    name: &str,
) -> Result<NamespaceOutcome> {
    validate_name(NameKind::Namespace, name)?;

    let exists = ops
        .namespace_exists(name)
        .await
        .map_err(|e| provisioning_failed(name, e))?;
    if exists {
        tracing::info!(namespace = name, "namespace already exists");
        return Ok(NamespaceOutcome::AlreadyExists);
    }

    let outcome = ops
        .create_namespace(name)
        .await
        .map_err(|e| provisioning_failed(name, e))?;
    match outcome {
        NamespaceOutcome::Created => tracing::info!(namespace = name, "namespace created"),
        NamespaceOutcome::AlreadyExists => {
            tracing::info!(namespace = name, "namespace appeared concurrently")
        }
    }
    Ok(outcome)
}

/// Any cluster-side failure while provisioning is a `NamespaceFailed`
fn provisioning_failed(name: &str, err: RolloutError) -> RolloutError {
    match err {
        RolloutError::NamespaceFailed { .. } | RolloutError::Core(_) => err,
        RolloutError::CommandFailed { stderr, .. } => RolloutError::NamespaceFailed {
            name: name.to_string(),
            message: stderr,
        },
        other => RolloutError::NamespaceFailed {
            name: name.to_string(),
            message: other.to_string(),
        },
    }
}
