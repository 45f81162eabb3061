//! Cluster operations seam
//!
//! Every component receives the cluster as an explicit `&impl ClusterOps`
//! argument. Two implementations ship with the crate:
//! - [`ShellCluster`](crate::shell::ShellCluster): drives the real `oc`/`kubectl` and `helm` CLIs
//! - [`MockCluster`](crate::mock::MockCluster): in-memory fake for tests

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Service};
use rollout_core::{ReleaseSpec, ReleaseStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;

/// Outcome of a namespace create request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamespaceOutcome {
    Created,
    AlreadyExists,
}

/// What the cluster knows about a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub name: String,
    pub namespace: String,
    pub revision: u32,
    pub status: ReleaseStatus,
}

/// An externally reachable address (OpenShift Route or Ingress rule)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEndpoint {
    /// `Route` or `Ingress`
    pub kind: String,
    pub name: String,
    pub host: String,
    pub path: Option<String>,
    pub tls: bool,
}

impl ExternalEndpoint {
    /// Browser URL for this endpoint
    pub fn url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        let path = self.path.as_deref().unwrap_or("");
        let path = if path.is_empty() || path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        format!("{}://{}{}", scheme, self.host, path)
    }
}

/// Operations the orchestrator needs from a cluster
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// Whether a CLI tool can be invoked; returns its version line when it can
    async fn tool_available(&self, binary: &str) -> Result<Option<String>>;

    /// The authenticated identity, or `None` when not logged in
    async fn current_user(&self) -> Result<Option<String>>;

    async fn namespace_exists(&self, name: &str) -> Result<bool>;

    /// Create a namespace; an existing one is reported, not an error
    async fn create_namespace(&self, name: &str) -> Result<NamespaceOutcome>;

    /// Delete a namespace; returns `false` when it did not exist
    async fn delete_namespace(&self, name: &str) -> Result<bool>;

    async fn get_release(&self, name: &str, namespace: &str) -> Result<Option<ReleaseRecord>>;

    /// Install a release that does not exist yet
    async fn install_release(&self, spec: &ReleaseSpec, timeout: Duration)
    -> Result<ReleaseRecord>;

    /// Upgrade an existing release in place
    async fn upgrade_release(&self, spec: &ReleaseSpec, timeout: Duration)
    -> Result<ReleaseRecord>;

    /// Uninstall a release; returns `false` when it did not exist
    async fn uninstall_release(&self, name: &str, namespace: &str) -> Result<bool>;

    async fn list_pods(&self, namespace: &str, selector: Option<&str>) -> Result<Vec<Pod>>;

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>>;

    async fn list_external_endpoints(&self, namespace: &str) -> Result<Vec<ExternalEndpoint>>;
}
