//! Rollout Kube - cluster operations for the rollout orchestrator
//!
//! This crate provides:
//! - **Cluster seam**: `ClusterOps` with a CLI-backed (`ShellCluster`) and an in-memory (`MockCluster`) implementation
//! - **Prerequisite Checker**: ordered tool/login/file checks with remediation hints
//! - **Namespace Provisioner**: idempotent namespace creation
//! - **Release Applier**: upgrade-or-install bounded by a timeout, no rollback
//! - **Readiness Waiter**: fixed-interval pod readiness polling within a deadline
//! - **Status Reporter**: pods, services and external endpoints of a namespace
//! - **Release Remover**: confirmation-gated release and namespace teardown
//! - **Endpoint Probe**: classifies what an OpenAI-compatible endpoint answers
//! - **Pipeline**: deploy and undeploy flows with a progress observer

pub mod apply;
pub mod error;
pub mod mock;
pub mod namespace;
pub mod ops;
pub mod pipeline;
pub mod prereq;
pub mod probe;
pub mod remove;
pub mod shell;
pub mod status;
pub mod wait;

pub use apply::apply_release;
pub use error::{Result, RolloutError};
pub use mock::{FailPoint, MockCluster, OperationCounts};
pub use namespace::ensure_namespace;
pub use ops::{ClusterOps, ExternalEndpoint, NamespaceOutcome, ReleaseRecord};
pub use pipeline::{
    DeployOutcome, DeployRequest, NoopObserver, Phase, Rollout, RolloutObserver,
    UndeployOutcome, UndeployRequest,
};
pub use prereq::{PrerequisiteReport, check_all, evaluate};
pub use probe::{EndpointProbe, ProbeResult, ProbeVerdict};
pub use remove::{RemovalOutcome, remove_namespace, remove_release};
pub use shell::{ClusterFlavor, ShellCluster};
pub use status::{EndpointRow, PodRow, Section, ServiceRow, Snapshot, report};
pub use wait::{
    PodReadiness, ReadinessPoll, ReadinessReport, ReadinessWaiter, pod_is_ready, wait_ready,
};
