//! ShellCluster against stand-in `oc` and `helm` scripts
//!
//! Everything runs in one test so no other test forks while the scripts
//! are being written.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rollout_core::{ChartSource, ReleaseSpec, ReleaseStatus, Values};
use rollout_kube::{
    ClusterFlavor, ClusterOps, NamespaceOutcome, RolloutError, ShellCluster, apply_release,
    ensure_namespace,
};
use tempfile::TempDir;

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn shell_cluster_against_stand_in_clis() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("calls.log");
    let log = log.display();

    let oc = script(
        dir.path(),
        "oc",
        &format!(
            r#"echo "oc $@" >> {log}
case "$1" in
  version) echo "Client Version: 4.16.0" ;;
  whoami) echo "developer" ;;
  get)
    case "$2" in
      namespace)
        if [ "$3" = "team-a" ]; then echo "namespace/team-a"; exit 0; fi
        if [ "$3" = "locked" ]; then echo "Error from server (Forbidden): namespaces \"locked\" is forbidden" >&2; exit 1; fi
        echo "Error from server (NotFound): namespaces \"$3\" not found" >&2; exit 1 ;;
      pods) echo '{{"apiVersion":"v1","kind":"List","items":[{{"apiVersion":"v1","kind":"Pod","metadata":{{"name":"ui-0"}},"status":{{"phase":"Running","conditions":[{{"type":"Ready","status":"True"}}]}}}}]}}' ;;
      routes) echo '{{"items":[{{"metadata":{{"name":"ui"}},"spec":{{"host":"ui.apps.example.com","tls":{{"termination":"edge"}}}}}}]}}' ;;
    esac ;;
  new-project)
    if [ "$2" = "team-a" ]; then echo "Error from server (AlreadyExists): project.project.openshift.io \"team-a\" already exists" >&2; exit 1; fi
    if [ "$2" = "locked" ]; then echo "Error from server (Forbidden): forbidden" >&2; exit 1; fi
    echo "Now using project \"$2\"" ;;
esac
"#
        ),
    );

    let helm = script(
        dir.path(),
        "helm",
        &format!(
            r#"echo "helm $@" >> {log}
case "$1" in
  version) echo "v3.15.2+g1a500d5" ;;
  status) echo "Error: release: not found" >&2; exit 1 ;;
  install)
    if [ "$2" = "garbled" ]; then echo "this is not json"; exit 0; fi
    for arg in "$@"; do
      case "$arg" in *.yaml) cp "$arg" {dir}/applied.yaml ;; esac
    done
    echo '{{"name":"app","namespace":"team-a","version":1,"info":{{"status":"deployed"}}}}' ;;
  uninstall) echo "Error: uninstall: Release not loaded: app: release: not found" >&2; exit 1 ;;
esac
"#,
            dir = dir.path().display()
        ),
    );

    let oc = oc.display().to_string();
    let helm = helm.display().to_string();
    let cluster = ShellCluster::new(&oc, &helm);
    assert_eq!(cluster.flavor(), ClusterFlavor::OpenShift);

    // prerequisites
    assert_eq!(
        cluster.tool_available(&oc).await.unwrap().as_deref(),
        Some("Client Version: 4.16.0")
    );
    assert_eq!(
        cluster.tool_available(&helm).await.unwrap().as_deref(),
        Some("v3.15.2+g1a500d5")
    );
    assert_eq!(cluster.current_user().await.unwrap().as_deref(), Some("developer"));

    // namespaces
    assert!(cluster.namespace_exists("team-a").await.unwrap());
    assert!(!cluster.namespace_exists("team-b").await.unwrap());
    assert_eq!(
        cluster.create_namespace("team-a").await.unwrap(),
        NamespaceOutcome::AlreadyExists
    );
    assert_eq!(
        cluster.create_namespace("team-b").await.unwrap(),
        NamespaceOutcome::Created
    );
    assert!(matches!(
        cluster.create_namespace("locked").await,
        Err(RolloutError::NamespaceFailed { .. })
    ));

    // a forbidden lookup surfaces as a provisioning failure with a hint
    let err = ensure_namespace(&cluster, "locked").await.unwrap_err();
    assert!(matches!(err, RolloutError::NamespaceFailed { .. }), "{err:?}");
    assert!(err.to_string().contains("Forbidden"));
    assert!(err.remediation().is_some());

    // releases
    assert!(cluster.get_release("app", "team-a").await.unwrap().is_none());
    let mut params = Values::new();
    params.set("frontend.replicas", 2.into()).unwrap();
    let spec = ReleaseSpec::new("app", "team-a", ChartSource::Reference("oci://charts/app".into()))
        .with_params(params);
    let record = cluster
        .install_release(&spec, Duration::from_secs(600))
        .await
        .unwrap();
    assert_eq!(record.revision, 1);
    assert_eq!(record.status, ReleaseStatus::Deployed);
    let applied = Values::from_file(dir.path().join("applied.yaml")).unwrap();
    assert_eq!(applied.get("frontend.replicas").unwrap(), 2);
    assert!(!cluster.uninstall_release("app", "team-a").await.unwrap());

    // helm succeeding with output we cannot read is still a failed apply
    let garbled = ReleaseSpec::new(
        "garbled",
        "team-a",
        ChartSource::Reference("oci://charts/app".into()),
    );
    let err = apply_release(&cluster, &garbled, Duration::from_secs(600))
        .await
        .unwrap_err();
    match &err {
        RolloutError::ApplyFailed { name, message, .. } => {
            assert_eq!(name, "garbled");
            assert!(message.contains("helm"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.remediation().unwrap().contains("nothing was rolled back"));

    // reads
    let pods = cluster.list_pods("team-a", Some("app=ui")).await.unwrap();
    assert_eq!(pods[0].metadata.name.as_deref(), Some("ui-0"));
    let endpoints = cluster.list_external_endpoints("team-a").await.unwrap();
    assert_eq!(endpoints[0].url(), "https://ui.apps.example.com");

    let calls = std::fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert!(calls.contains("helm install app oci://charts/app --namespace team-a --timeout 600s --output json --values"));
    assert!(calls.contains("oc get pods --namespace team-a -o json --selector app=ui"));
    assert!(calls.contains("oc new-project team-b"));
}
