//! End-to-end deploy/undeploy flows against the in-memory cluster

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rollout_core::{
    ApplyAction, Confirmation, ReleaseStatus, RolloutConfig, ScriptedConfirmations, Values,
};
use rollout_kube::mock::{test_pod, test_service};
use rollout_kube::{
    DeployRequest, ExternalEndpoint, FailPoint, MockCluster, NamespaceOutcome, Phase,
    ReadinessPoll, ReleaseRecord, RemovalOutcome, Rollout, RolloutError, RolloutObserver,
    Section, UndeployRequest,
};
use tempfile::TempDir;

const NS: &str = "team-a";
const RELEASE: &str = "f5-ai-security";
const INSTANCE: (&str, &str) = ("app.kubernetes.io/instance", RELEASE);

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl RolloutObserver for Recorder {
    fn phase_started(&mut self, phase: Phase) {
        self.events.lock().unwrap().push(format!("start {:?}", phase));
    }

    fn phase_finished(&mut self, phase: Phase, _summary: &str) {
        self.events.lock().unwrap().push(format!("finish {:?}", phase));
    }

    fn warning(&mut self, message: &str) {
        self.events.lock().unwrap().push(format!("warn {}", message));
    }

    fn readiness_poll(&mut self, poll: &ReadinessPoll<'_>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("poll {}", poll.attempt));
    }
}

fn deploy_request(dir: &TempDir) -> DeployRequest {
    let config = RolloutConfig {
        values_file: dir.path().join("values.yaml"),
        chart: "oci://registry.example.com/charts/f5-ai-security".to_string(),
        poll_interval: Duration::from_secs(5),
        readiness_timeout: Duration::from_secs(60),
        ..RolloutConfig::default()
    };
    DeployRequest::from_config(&config, Some(NS))
}

fn ready_cluster() -> MockCluster {
    MockCluster::healthy("oc", "helm")
        .with_pod_snapshots(
            NS,
            vec![
                vec![test_pod("ui-0", &[INSTANCE], false)],
                vec![test_pod("ui-0", &[INSTANCE], true)],
            ],
        )
        .with_services(NS, vec![test_service("ui", "172.30.12.4", &[8501])])
        .with_endpoints(
            NS,
            vec![ExternalEndpoint {
                kind: "Route".into(),
                name: "ui".into(),
                host: "ui-team-a.apps.example.com".into(),
                path: None,
                tls: true,
            }],
        )
}

#[tokio::test(start_paused = true)]
async fn deploy_team_a_without_values_file() {
    let dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let mut rollout = Rollout::new(ready_cluster()).with_observer(recorder.clone());

    let outcome = rollout.deploy(&deploy_request(&dir)).await.unwrap();

    assert_eq!(outcome.namespace, NamespaceOutcome::Created);
    assert_eq!(outcome.release.action, ApplyAction::Installed);
    assert_eq!(outcome.release.namespace, NS);
    assert!(outcome.is_ready());
    assert!(outcome.prerequisites.values_file.is_none());
    assert!(
        outcome
            .warnings
            .iter()
            .any(|w| w.ends_with("not found, using defaults"))
    );
    assert!(
        outcome
            .warnings
            .iter()
            .any(|w| w.contains("using chart defaults"))
    );
    assert_eq!(
        outcome.snapshot.first_url(),
        Some("https://ui-team-a.apps.example.com")
    );

    let events = recorder.events();
    let phases: Vec<&String> = events.iter().filter(|e| e.starts_with("start")).collect();
    assert_eq!(
        phases,
        vec![
            "start Prerequisites",
            "start Namespace",
            "start Apply",
            "start Readiness",
            "start Report"
        ]
    );
    assert!(events.contains(&"poll 2".to_string()));
    assert_eq!(
        rollout.ops().journal(),
        vec!["create-namespace team-a", "install team-a/f5-ai-security"]
    );
}

#[tokio::test(start_paused = true)]
async fn component_warnings_are_recorded_once() {
    let dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let mut request = deploy_request(&dir);
    request.api_spec = Some(dir.path().join("openapi.json"));
    let mut rollout = Rollout::new(ready_cluster()).with_observer(recorder.clone());

    let outcome = rollout.deploy(&request).await.unwrap();

    let chart_defaults = outcome
        .warnings
        .iter()
        .filter(|w| w.contains("chart defaults"))
        .count();
    assert_eq!(chart_defaults, 1);
    assert!(
        outcome
            .warnings
            .iter()
            .any(|w| w.ends_with("the edge API definition was not verified"))
    );
    assert!(outcome.prerequisites.api_spec.is_none());
    // the checker and the applier already logged these
    assert!(!recorder.events().iter().any(|e| e.starts_with("warn ")));
}

#[tokio::test(start_paused = true)]
async fn readiness_timeout_reaches_the_observer() {
    let dir = TempDir::new().unwrap();
    let cluster = MockCluster::healthy("oc", "helm")
        .with_pod_snapshots(NS, vec![vec![test_pod("ui-0", &[INSTANCE], false)]]);
    let recorder = Recorder::default();
    let mut rollout = Rollout::new(cluster).with_observer(recorder.clone());

    rollout.deploy(&deploy_request(&dir)).await.unwrap();

    let warned: Vec<String> = recorder
        .events()
        .into_iter()
        .filter(|e| e.starts_with("warn "))
        .collect();
    assert_eq!(warned.len(), 1);
    assert!(warned[0].contains("not ready after"));
}

#[tokio::test(start_paused = true)]
async fn redeploy_upgrades_in_place() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("values.yaml"), "frontend:\n  replicas: 2\n").unwrap();
    let mut rollout = Rollout::new(ready_cluster());
    let request = deploy_request(&dir);

    let first = rollout.deploy(&request).await.unwrap();
    let second = rollout.deploy(&request).await.unwrap();

    assert_eq!(first.release.action, ApplyAction::Installed);
    assert_eq!(second.release.action, ApplyAction::Upgraded);
    assert_eq!(second.namespace, NamespaceOutcome::AlreadyExists);
    assert_eq!(second.release.revision, 2);
    assert!(second.warnings.is_empty());

    let counts = rollout.ops().operation_counts();
    assert_eq!(counts.namespace_creates, 1);
    assert_eq!(counts.installs, 1);
    assert_eq!(rollout.ops().namespace_count(), 1);
}

#[tokio::test]
async fn missing_prerequisite_blocks_every_mutation() {
    let dir = TempDir::new().unwrap();
    let cluster = MockCluster::new()
        .with_tool("oc", "Client Version: 4.16.0")
        .with_tool("helm", "v3.15.2");
    let mut rollout = Rollout::new(cluster);

    let err = rollout.deploy(&deploy_request(&dir)).await.unwrap_err();

    assert!(matches!(err, RolloutError::PrerequisiteMissing { .. }));
    assert!(err.remediation().unwrap().contains("oc login"));
    let counts = rollout.ops().operation_counts();
    assert_eq!(counts.mutations(), 0);
    assert_eq!(counts.namespace_queries, 0);
}

#[tokio::test(start_paused = true)]
async fn readiness_timeout_still_reports() {
    let dir = TempDir::new().unwrap();
    let cluster = MockCluster::healthy("oc", "helm")
        .with_pod_snapshots(NS, vec![vec![test_pod("ui-0", &[INSTANCE], false)]]);
    let mut rollout = Rollout::new(cluster);

    let started = tokio::time::Instant::now();
    let outcome = rollout.deploy(&deploy_request(&dir)).await.unwrap();

    assert!(started.elapsed() <= Duration::from_secs(61));
    assert!(!outcome.is_ready());
    assert!(matches!(
        outcome.readiness,
        Err(RolloutError::ReadinessTimeout { .. })
    ));
    assert!(matches!(outcome.snapshot.pods, Section::Rows(ref rows) if rows.len() == 1));
}

#[tokio::test]
async fn apply_failure_stops_before_readiness() {
    let dir = TempDir::new().unwrap();
    let cluster = ready_cluster().fail_on(FailPoint::Install, "chart requires kubeVersion >= 1.29");
    let recorder = Recorder::default();
    let mut rollout = Rollout::new(cluster).with_observer(recorder.clone());

    let err = rollout.deploy(&deploy_request(&dir)).await.unwrap_err();

    assert!(matches!(err, RolloutError::ApplyFailed { .. }));
    assert!(!recorder.events().contains(&"start Readiness".to_string()));
    assert_eq!(rollout.ops().operation_counts().pod_lists, 0);
    // no rollback: the namespace stays
    assert!(rollout.ops().has_namespace(NS));
}

#[tokio::test]
async fn overrides_reach_the_release() {
    let dir = TempDir::new().unwrap();
    let mut request = deploy_request(&dir);
    let mut overrides = Values::new();
    overrides
        .set("frontend.env.DEFAULT_MODEL", "remote-llm/other".into())
        .unwrap();
    request.overrides = overrides;
    request.readiness_timeout = Duration::ZERO;

    let mut rollout = Rollout::new(ready_cluster());
    let outcome = rollout.deploy(&request).await.unwrap();
    assert!(!outcome.warnings.iter().any(|w| w.contains("chart defaults")));

    let params = rollout.ops().applied_params(RELEASE, NS).unwrap();
    assert_eq!(
        params.get("frontend.env.DEFAULT_MODEL").unwrap(),
        "remote-llm/other"
    );
}

fn deployed_cluster() -> MockCluster {
    MockCluster::healthy("oc", "helm").with_release(ReleaseRecord {
        name: RELEASE.into(),
        namespace: NS.into(),
        revision: 3,
        status: ReleaseStatus::Deployed,
    })
}

fn undeploy_request() -> UndeployRequest {
    UndeployRequest::from_config(&RolloutConfig::default(), Some(NS))
}

#[tokio::test]
async fn undeploy_declined_removes_nothing() {
    let mut rollout = Rollout::new(deployed_cluster());
    let mut answers = ScriptedConfirmations::new(["no"]);

    let outcome = rollout.undeploy(&undeploy_request(), &mut answers).await.unwrap();

    assert_eq!(outcome.release, RemovalOutcome::Declined);
    assert_eq!(outcome.namespace, None);
    assert_eq!(answers.prompts().len(), 1);
    assert_eq!(rollout.ops().operation_counts().mutations(), 0);
    assert!(rollout.ops().release(RELEASE, NS).is_some());
}

#[tokio::test]
async fn undeploy_yes_yes_removes_everything() {
    let mut rollout = Rollout::new(deployed_cluster());
    let mut answers = ScriptedConfirmations::new(["yes", "YES "]);

    let outcome = rollout.undeploy(&undeploy_request(), &mut answers).await.unwrap();

    assert_eq!(outcome.release, RemovalOutcome::Removed);
    assert_eq!(outcome.namespace, Some(RemovalOutcome::Removed));
    assert_eq!(
        rollout.ops().journal(),
        vec![
            "uninstall team-a/f5-ai-security",
            "delete-namespace team-a"
        ]
    );
    assert!(answers.prompts()[0].contains("f5-ai-security"));
    assert!(answers.prompts()[1].contains("team-a"));
}

#[tokio::test]
async fn undeploy_keeps_namespace_on_second_no() {
    let mut rollout = Rollout::new(deployed_cluster());
    let mut answers = ScriptedConfirmations::new(["yes", "y"]);

    let outcome = rollout.undeploy(&undeploy_request(), &mut answers).await.unwrap();

    assert_eq!(outcome.release, RemovalOutcome::Removed);
    assert_eq!(outcome.namespace, Some(RemovalOutcome::Declined));
    assert!(rollout.ops().has_namespace(NS));
}

#[tokio::test]
async fn undeploy_keep_namespace_asks_once() {
    let mut rollout = Rollout::new(deployed_cluster());
    let mut request = undeploy_request();
    request.purge_namespace = false;
    let mut answers = ScriptedConfirmations::new(["yes"]);

    let outcome = rollout.undeploy(&request, &mut answers).await.unwrap();

    assert_eq!(outcome.namespace, None);
    assert_eq!(answers.prompts().len(), 1);
}

#[tokio::test]
async fn undeploy_removal_failure() {
    let cluster = deployed_cluster().fail_on(FailPoint::Uninstall, "context deadline exceeded");
    let mut rollout = Rollout::new(cluster);
    let mut answers = ScriptedConfirmations::new(["yes", "yes"]);

    let err = rollout
        .undeploy(&undeploy_request(), &mut answers)
        .await
        .unwrap_err();
    assert!(matches!(err, RolloutError::RemovalFailed { .. }));
    assert_eq!(answers.prompts().len(), 1);
}

#[test]
fn confirmation_is_exact() {
    assert!(Confirmation::parse(" yes ").is_yes());
    for input in ["y", "", "yess", "no", "ja"] {
        assert!(!Confirmation::parse(input).is_yes(), "{input:?}");
    }
}

#[tokio::test]
async fn status_reads_namespace() {
    let rollout = Rollout::new(ready_cluster());
    let snapshot = rollout.status(NS).await;
    assert_eq!(snapshot.namespace, NS);
    assert!(snapshot.services.is_available());
    assert_eq!(rollout.ops().operation_counts().mutations(), 0);
}
