//! Release applier
//!
//! Upgrade-or-install keyed on (release name, namespace). There is no
//! rollback: a failure leaves whatever the cluster accepted in place and
//! the error says where to look.

use rollout_core::{ApplyAction, NameKind, ReleaseHandle, ReleaseSpec, validate_name};
use std::time::Duration;

use crate::error::{Result, RolloutError};
use crate::ops::ClusterOps;

/// Apply `spec`, bounded by `timeout`
///
/// The namespace must already exist. A release that exists is upgraded in
/// place; otherwise it is installed. Missing parameters are allowed and the
/// chart defaults apply.
pub async fn apply_release<O: ClusterOps + ?Sized>(
    ops: &O,
    spec: &ReleaseSpec,
    timeout: Duration,
) -> Result<ReleaseHandle> {
    validate_name(NameKind::Release, &spec.name)?;
    validate_name(NameKind::Namespace, &spec.namespace)?;

    match spec.params.as_ref().filter(|p| !p.is_empty()) {
        Some(params) => {
            for (key, value) in params.flatten_redacted() {
                tracing::debug!(release = %spec.name, "{} = {}", key, value);
            }
        }
        None => tracing::warn!(release = %spec.name, "no parameters supplied, using chart defaults"),
    }

    let applying = async {
        if !ops.namespace_exists(&spec.namespace).await? {
            return Err(RolloutError::ApplyFailed {
                name: spec.name.clone(),
                namespace: spec.namespace.clone(),
                message: format!("namespace '{}' does not exist", spec.namespace),
            });
        }

        let existing = ops.get_release(&spec.name, &spec.namespace).await?;
        let (record, action) = match existing {
            Some(current) => {
                tracing::info!(
                    release = %spec.name,
                    namespace = %spec.namespace,
                    revision = current.revision,
                    "upgrading release"
                );
                (ops.upgrade_release(spec, timeout).await?, ApplyAction::Upgraded)
            }
            None => {
                tracing::info!(
                    release = %spec.name,
                    namespace = %spec.namespace,
                    "installing release"
                );
                (ops.install_release(spec, timeout).await?, ApplyAction::Installed)
            }
        };

        Ok(ReleaseHandle {
            name: record.name,
            namespace: record.namespace,
            revision: record.revision,
            action,
            status: record.status,
        })
    };

    match tokio::time::timeout(timeout, applying).await {
        Ok(Ok(handle)) => Ok(handle),
        Ok(Err(e)) => Err(apply_failed(spec, e)),
        Err(_) => Err(RolloutError::ApplyTimeout {
            name: spec.name.clone(),
            namespace: spec.namespace.clone(),
            timeout,
        }),
    }
}

/// Everything that goes wrong once the apply started is an `ApplyFailed`
fn apply_failed(spec: &ReleaseSpec, err: RolloutError) -> RolloutError {
    let message = match err {
        RolloutError::ApplyFailed { .. } | RolloutError::ApplyTimeout { .. } => return err,
        RolloutError::Core(_) => return err,
        RolloutError::CommandFailed { stderr, .. } => stderr,
        other => other.to_string(),
    };
    RolloutError::ApplyFailed {
        name: spec.name.clone(),
        namespace: spec.namespace.clone(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FailPoint, MockCluster};
    use rollout_core::{ChartSource, ReleaseStatus, Values};

    fn spec() -> ReleaseSpec {
        ReleaseSpec::new(
            "f5-ai-security",
            "team-a",
            ChartSource::Reference("oci://charts/f5-ai-security".into()),
        )
    }

    #[tokio::test]
    async fn test_install_then_upgrade() {
        let cluster = MockCluster::new().with_namespace("team-a");
        let timeout = Duration::from_secs(60);

        let first = apply_release(&cluster, &spec(), timeout).await.unwrap();
        assert_eq!(first.action, ApplyAction::Installed);
        assert_eq!(first.revision, 1);
        assert_eq!(first.status, ReleaseStatus::Deployed);

        let mut params = Values::new();
        params.set("frontend.replicas", 2.into()).unwrap();
        let second = apply_release(&cluster, &spec().with_params(params), timeout)
            .await
            .unwrap();
        assert_eq!(second.action, ApplyAction::Upgraded);
        assert_eq!(second.revision, 2);

        let counts = cluster.operation_counts();
        assert_eq!(counts.installs, 1);
        assert_eq!(counts.upgrades, 1);
    }

    #[tokio::test]
    async fn test_missing_namespace() {
        let cluster = MockCluster::new();
        let err = apply_release(&cluster, &spec(), Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, RolloutError::ApplyFailed { .. }));
        assert_eq!(cluster.operation_counts().installs, 0);
    }

    #[tokio::test]
    async fn test_rejection_is_not_rolled_back() {
        let cluster = MockCluster::new()
            .with_namespace("team-a")
            .fail_on(FailPoint::Install, "admission webhook denied the request");
        let err = apply_release(&cluster, &spec(), Duration::from_secs(60))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("admission webhook"));
        assert_eq!(cluster.operation_counts().uninstalls, 0);
        assert!(cluster.has_namespace("team-a"));
    }

    #[tokio::test]
    async fn test_status_query_failure_becomes_apply_failure() {
        let cluster = MockCluster::new()
            .with_namespace("team-a")
            .fail_on(FailPoint::GetRelease, "connection refused");
        let err = apply_release(&cluster, &spec(), Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, RolloutError::ApplyFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let cluster = MockCluster::new()
            .with_namespace("team-a")
            .with_apply_delay(Duration::from_secs(900));

        let started = tokio::time::Instant::now();
        let err = apply_release(&cluster, &spec(), Duration::from_secs(600))
            .await
            .unwrap_err();

        assert!(matches!(err, RolloutError::ApplyTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(601));
        assert!(cluster.release("f5-ai-security", "team-a").is_none());
    }

    #[tokio::test]
    async fn test_invalid_release_name() {
        let cluster = MockCluster::new().with_namespace("team-a");
        let bad = ReleaseSpec::new("Bad_Name", "team-a", ChartSource::Reference("x".into()));
        let err = apply_release(&cluster, &bad, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RolloutError::Core(_)));
        assert_eq!(cluster.operation_counts().mutations(), 0);
    }

    #[test]
    fn test_every_apply_phase_failure_is_classified() {
        let spec = spec();
        let failures = [
            RolloutError::parse("helm", "expected value at line 1 column 1"),
            RolloutError::CommandSpawn {
                program: "helm".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            },
            RolloutError::Io(std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full")),
        ];
        for failure in failures {
            let text = failure.to_string();
            match apply_failed(&spec, failure) {
                RolloutError::ApplyFailed { message, .. } => assert_eq!(message, text),
                other => panic!("unexpected error: {other:?}"),
            }
        }

        let timeout = RolloutError::ApplyTimeout {
            name: "f5-ai-security".into(),
            namespace: "team-a".into(),
            timeout: Duration::from_secs(1),
        };
        assert!(matches!(
            apply_failed(&spec, timeout),
            RolloutError::ApplyTimeout { .. }
        ));
    }
}
