//! Release remover
//!
//! Every destructive call takes a [`Confirmation`] token. Only
//! `Confirmation::Yes` reaches the cluster; anything else is a declined
//! no-op.

use rollout_core::Confirmation;
use serde::Serialize;

use crate::error::{Result, RolloutError};
use crate::ops::ClusterOps;

/// What a removal request did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalOutcome {
    Removed,
    /// The operator did not confirm; nothing was touched
    Declined,
    /// There was nothing to remove
    AlreadyAbsent,
}

impl std::fmt::Display for RemovalOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Removed => write!(f, "removed"),
            Self::Declined => write!(f, "declined"),
            Self::AlreadyAbsent => write!(f, "already absent"),
        }
    }
}

/// Uninstall release `name` from `namespace`
pub async fn remove_release<O: ClusterOps + ?Sized>(
    ops: &O,
    name: &str,
    namespace: &str,
    token: Confirmation,
) -> Result<RemovalOutcome> {
    if !token.is_yes() {
        tracing::info!(release = name, namespace, "release removal declined");
        return Ok(RemovalOutcome::Declined);
    }

    match ops.uninstall_release(name, namespace).await {
        Ok(true) => {
            tracing::info!(release = name, namespace, "release removed");
            Ok(RemovalOutcome::Removed)
        }
        Ok(false) => {
            tracing::warn!(release = name, namespace, "release not found, nothing to remove");
            Ok(RemovalOutcome::AlreadyAbsent)
        }
        Err(e) => Err(RolloutError::RemovalFailed {
            target: format!("release '{}' in namespace '{}'", name, namespace),
            message: e.to_string(),
        }),
    }
}

/// Delete `namespace` and everything left in it
pub async fn remove_namespace<O: ClusterOps + ?Sized>(
    ops: &O,
    namespace: &str,
    token: Confirmation,
) -> Result<RemovalOutcome> {
    if !token.is_yes() {
        tracing::info!(namespace, "namespace removal declined");
        return Ok(RemovalOutcome::Declined);
    }

    match ops.delete_namespace(namespace).await {
        Ok(true) => {
            tracing::info!(namespace, "namespace removed");
            Ok(RemovalOutcome::Removed)
        }
        Ok(false) => {
            tracing::warn!(namespace, "namespace not found, nothing to remove");
            Ok(RemovalOutcome::AlreadyAbsent)
        }
        Err(e) => Err(RolloutError::RemovalFailed {
            target: format!("namespace '{}'", namespace),
            message: e.to_string(),
        }),
    }
}
