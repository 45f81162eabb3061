//! Deploy and undeploy pipelines
//!
//! Deploy runs check → namespace → apply → wait → report. Any fatal error
//! stops the run; a readiness timeout is recorded in the outcome and the
//! report still runs. Undeploy runs the cluster-access checks, then asks
//! for confirmation before each destructive step.

use rollout_core::{
    ChartSource, ConfirmationSource, NameKind, PrerequisiteSet, ReleaseHandle, ReleaseSpec,
    RolloutConfig, Values, validate_name,
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::apply::apply_release;
use crate::error::{Result, RolloutError};
use crate::namespace::ensure_namespace;
use crate::ops::{ClusterOps, NamespaceOutcome};
use crate::prereq::{PrerequisiteReport, check_all};
use crate::remove::{RemovalOutcome, remove_namespace, remove_release};
use crate::status::{Snapshot, report};
use crate::wait::{ReadinessPoll, ReadinessReport, ReadinessWaiter};

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Prerequisites,
    Namespace,
    Apply,
    Readiness,
    Report,
    Removal,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Prerequisites => "Checking prerequisites",
            Phase::Namespace => "Provisioning namespace",
            Phase::Apply => "Applying release",
            Phase::Readiness => "Waiting for readiness",
            Phase::Report => "Collecting status",
            Phase::Removal => "Removing release",
        };
        write!(f, "{}", s)
    }
}

/// Progress hook; every method defaults to a no-op
pub trait RolloutObserver: Send {
    fn phase_started(&mut self, _phase: Phase) {}

    fn phase_finished(&mut self, _phase: Phase, _summary: &str) {}

    fn warning(&mut self, _message: &str) {}

    fn readiness_poll(&mut self, _poll: &ReadinessPoll<'_>) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RolloutObserver for NoopObserver {}

/// Everything deploy needs to know
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub namespace: String,
    pub release: String,
    pub chart: ChartSource,
    /// Optional parameters file; absence is a warning, not an error
    pub values_file: Option<PathBuf>,
    /// Optional OpenAPI document for the edge console; absence is a warning
    pub api_spec: Option<PathBuf>,
    /// Overrides applied on top of the values file (environment, `--set`)
    pub overrides: Values,
    pub apply_timeout: Duration,
    pub readiness_timeout: Duration,
    pub poll_interval: Duration,
    pub selector: String,
    pub kube_bin: String,
    pub helm_bin: String,
}

impl DeployRequest {
    /// Request built from configuration; `namespace` overrides the configured one
    pub fn from_config(config: &RolloutConfig, namespace: Option<&str>) -> Self {
        Self {
            namespace: namespace.unwrap_or(&config.namespace).to_string(),
            release: config.release.clone(),
            chart: ChartSource::parse(&config.chart),
            values_file: Some(config.values_file.clone()),
            api_spec: config.api_spec.clone(),
            overrides: Values::new(),
            apply_timeout: config.apply_timeout,
            readiness_timeout: config.readiness_timeout,
            poll_interval: config.poll_interval,
            selector: config.readiness_selector(),
            kube_bin: config.kube_bin.clone(),
            helm_bin: config.helm_bin.clone(),
        }
    }
}

/// Result of a deploy that got past the apply step
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    pub prerequisites: PrerequisiteReport,
    pub namespace: NamespaceOutcome,
    pub release: ReleaseHandle,
    /// `Err` holds the readiness timeout, which does not fail the deploy
    #[serde(serialize_with = "serialize_readiness")]
    pub readiness: std::result::Result<ReadinessReport, RolloutError>,
    pub snapshot: Snapshot,
    pub warnings: Vec<String>,
}

impl DeployOutcome {
    pub fn is_ready(&self) -> bool {
        self.readiness.is_ok()
    }
}

fn serialize_readiness<S: serde::Serializer>(
    readiness: &std::result::Result<ReadinessReport, RolloutError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match readiness {
        Ok(report) => report.serialize(serializer),
        Err(e) => e.serialize(serializer),
    }
}

/// Everything undeploy needs to know
#[derive(Debug, Clone)]
pub struct UndeployRequest {
    pub namespace: String,
    pub release: String,
    /// Ask a second time and delete the namespace
    pub purge_namespace: bool,
    pub kube_bin: String,
    pub helm_bin: String,
}

impl UndeployRequest {
    pub fn from_config(config: &RolloutConfig, namespace: Option<&str>) -> Self {
        Self {
            namespace: namespace.unwrap_or(&config.namespace).to_string(),
            release: config.release.clone(),
            purge_namespace: true,
            kube_bin: config.kube_bin.clone(),
            helm_bin: config.helm_bin.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndeployOutcome {
    pub release: RemovalOutcome,
    /// `None` when the namespace step was not reached or not requested
    pub namespace: Option<RemovalOutcome>,
}

/// Orchestrates the components against one cluster
pub struct Rollout<O: ClusterOps> {
    ops: O,
    observer: Box<dyn RolloutObserver>,
}

impl<O: ClusterOps> Rollout<O> {
    pub fn new(ops: O) -> Self {
        Self {
            ops,
            observer: Box::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl RolloutObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn ops(&self) -> &O {
        &self.ops
    }

    /// Check, provision, apply, wait and report
    pub async fn deploy(&mut self, request: &DeployRequest) -> Result<DeployOutcome> {
        validate_name(NameKind::Namespace, &request.namespace)?;
        validate_name(NameKind::Release, &request.release)?;
        let mut warnings = Vec::new();

        // Prerequisites
        self.observer.phase_started(Phase::Prerequisites);
        let set = PrerequisiteSet::standard(
            &request.kube_bin,
            &request.helm_bin,
            request.values_file.clone(),
            request.api_spec.clone(),
        );
        let prerequisites = check_all(&self.ops, &set).await?;
        // already logged by the checker; keep them for the outcome only
        warnings.extend(prerequisites.warnings.iter().map(ToString::to_string));
        let passed = prerequisites.outcomes.iter().filter(|o| o.passed).count();
        self.observer
            .phase_finished(Phase::Prerequisites, &format!("{} checks passed", passed));

        // Namespace
        self.observer.phase_started(Phase::Namespace);
        let namespace = ensure_namespace(&self.ops, &request.namespace).await?;
        self.observer.phase_finished(
            Phase::Namespace,
            &match namespace {
                NamespaceOutcome::Created => format!("created {}", request.namespace),
                NamespaceOutcome::AlreadyExists => {
                    format!("{} already exists", request.namespace)
                }
            },
        );

        // Apply
        self.observer.phase_started(Phase::Apply);
        let spec = resolve_spec(request, prerequisites.values_file.as_deref())?;
        if spec.uses_defaults() {
            // the applier logs this one
            warnings.push("no release parameters supplied, using chart defaults".to_string());
        }
        let release = apply_release(&self.ops, &spec, request.apply_timeout).await?;
        self.observer.phase_finished(
            Phase::Apply,
            &format!("{} revision {}", release.action, release.revision),
        );

        // Readiness (soft)
        self.observer.phase_started(Phase::Readiness);
        let waiter = ReadinessWaiter::new(request.readiness_timeout)
            .with_interval(request.poll_interval);
        let observer = &mut self.observer;
        let waited = waiter
            .wait(&self.ops, &request.namespace, &request.selector, |poll| {
                observer.readiness_poll(&poll)
            })
            .await;
        let readiness = match waited {
            Ok(ready) => {
                self.observer.phase_finished(Phase::Readiness, &ready.summary());
                Ok(ready)
            }
            Err(e) if !e.is_fatal() => {
                self.warn(&mut warnings, e.to_string());
                Err(e)
            }
            Err(e) => return Err(e),
        };

        // Report
        self.observer.phase_started(Phase::Report);
        let snapshot = report(&self.ops, &request.namespace).await;
        self.observer.phase_finished(
            Phase::Report,
            snapshot.first_url().unwrap_or("no external endpoint"),
        );

        Ok(DeployOutcome {
            prerequisites,
            namespace,
            release,
            readiness,
            snapshot,
            warnings,
        })
    }

    /// Check access, then remove the release and optionally the namespace
    ///
    /// Declining the release prompt ends the teardown; the namespace prompt
    /// is only shown after the release step went through.
    pub async fn undeploy<C: ConfirmationSource + ?Sized>(
        &mut self,
        request: &UndeployRequest,
        confirmations: &mut C,
    ) -> Result<UndeployOutcome> {
        validate_name(NameKind::Namespace, &request.namespace)?;

        self.observer.phase_started(Phase::Prerequisites);
        let set = PrerequisiteSet::cluster_access(&request.kube_bin, &request.helm_bin);
        let prerequisites = check_all(&self.ops, &set).await?;
        self.observer.phase_finished(
            Phase::Prerequisites,
            &format!("{} checks passed", prerequisites.outcomes.len()),
        );

        self.observer.phase_started(Phase::Removal);
        let token = confirmations.confirm(&format!(
            "Remove release '{}' from namespace '{}'? Type 'yes' to confirm",
            request.release, request.namespace
        ));
        let release = remove_release(&self.ops, &request.release, &request.namespace, token).await?;
        if release == RemovalOutcome::Declined {
            self.observer
                .phase_finished(Phase::Removal, "teardown cancelled, nothing removed");
            return Ok(UndeployOutcome {
                release,
                namespace: None,
            });
        }

        let namespace = if request.purge_namespace {
            let token = confirmations.confirm(&format!(
                "Delete namespace '{}' and everything left in it? Type 'yes' to confirm",
                request.namespace
            ));
            Some(remove_namespace(&self.ops, &request.namespace, token).await?)
        } else {
            None
        };

        self.observer.phase_finished(
            Phase::Removal,
            &format!(
                "release {}, namespace {}",
                release,
                namespace.map_or_else(|| "kept".to_string(), |n| n.to_string())
            ),
        );
        Ok(UndeployOutcome { release, namespace })
    }

    /// Snapshot of the namespace; never fails
    pub async fn status(&self, namespace: &str) -> Snapshot {
        report(&self.ops, namespace).await
    }

    fn warn(&mut self, warnings: &mut Vec<String>, message: String) {
        self.observer.warning(&message);
        warnings.push(message);
    }
}

/// Parameters file, then overrides; `None` when nothing was supplied
fn resolve_spec(
    request: &DeployRequest,
    values_file: Option<&std::path::Path>,
) -> Result<ReleaseSpec> {
    let mut params = match values_file {
        Some(path) => Values::from_file(path)?,
        None => Values::new(),
    };
    params.merge(&request.overrides);

    let spec = ReleaseSpec::new(&request.release, &request.namespace, request.chart.clone());
    Ok(if params.is_empty() {
        spec
    } else {
        spec.with_params(params)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(dir: &TempDir) -> DeployRequest {
        let mut config = RolloutConfig::default();
        config.values_file = dir.path().join("values.yaml");
        DeployRequest::from_config(&config, Some("team-a"))
    }

    #[test]
    fn test_from_config() {
        let config = RolloutConfig::default();
        let req = DeployRequest::from_config(&config, None);
        assert_eq!(req.namespace, "f5-ai-security");
        assert_eq!(req.selector, "app.kubernetes.io/instance=f5-ai-security");
        assert!(matches!(req.chart, ChartSource::Path(_) | ChartSource::Reference(_)));

        let undeploy = UndeployRequest::from_config(&config, Some("team-b"));
        assert_eq!(undeploy.namespace, "team-b");
        assert!(undeploy.purge_namespace);
    }

    #[test]
    fn test_resolve_spec_without_anything() {
        let dir = TempDir::new().unwrap();
        let spec = resolve_spec(&request(&dir), None).unwrap();
        assert!(spec.uses_defaults());
    }

    #[test]
    fn test_resolve_spec_overrides_win() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("values.yaml");
        std::fs::write(&file, "frontend:\n  replicas: 1\n  image: ui:1.0\n").unwrap();

        let mut req = request(&dir);
        req.overrides.set("frontend.replicas", 3.into()).unwrap();
        let spec = resolve_spec(&req, Some(&file)).unwrap();

        let params = spec.params.unwrap();
        assert_eq!(params.get("frontend.replicas").unwrap(), 3);
        assert_eq!(params.get("frontend.image").unwrap(), "ui:1.0");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Apply.to_string(), "Applying release");
    }
}
