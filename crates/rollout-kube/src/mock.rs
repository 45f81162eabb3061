//! In-memory cluster for testing
//!
//! Behaves like a small cluster: namespaces, releases keyed by
//! (namespace, name), scripted pod snapshots that advance on every poll,
//! and injectable failures. Every call is counted and every mutation is
//! appended to an ordered journal for assertions.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Pod, PodCondition, PodStatus, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use rollout_core::{ReleaseSpec, ReleaseStatus, Values};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{Result, RolloutError};
use crate::ops::{ClusterOps, ExternalEndpoint, NamespaceOutcome, ReleaseRecord};

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    NamespaceQuery,
    CreateNamespace,
    DeleteNamespace,
    GetRelease,
    Install,
    Upgrade,
    Uninstall,
    ListPods,
    ListServices,
    ListEndpoints,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub tool_checks: usize,
    pub user_checks: usize,
    pub namespace_queries: usize,
    pub namespace_creates: usize,
    pub namespace_deletes: usize,
    pub release_gets: usize,
    pub installs: usize,
    pub upgrades: usize,
    pub uninstalls: usize,
    pub pod_lists: usize,
    pub service_lists: usize,
    pub endpoint_lists: usize,
}

impl OperationCounts {
    /// Calls that change (or try to change) cluster state
    pub fn mutations(&self) -> usize {
        self.namespace_creates
            + self.namespace_deletes
            + self.installs
            + self.upgrades
            + self.uninstalls
    }
}

#[derive(Debug, Default)]
struct MockState {
    tools: HashMap<String, String>,
    user: Option<String>,
    namespaces: BTreeSet<String>,
    /// (namespace, name) -> release
    releases: BTreeMap<(String, String), ReleaseRecord>,
    /// (namespace, name) -> parameters of the last apply
    applied_params: HashMap<(String, String), Values>,
    /// namespace -> snapshots still to be served; the last one repeats
    pod_script: HashMap<String, VecDeque<Vec<Pod>>>,
    services: HashMap<String, Vec<Service>>,
    endpoints: HashMap<String, Vec<ExternalEndpoint>>,
    failures: HashMap<FailPoint, String>,
    apply_delay: Option<Duration>,
}

/// In-memory [`ClusterOps`] implementation
#[derive(Clone, Default)]
pub struct MockCluster {
    state: Arc<RwLock<MockState>>,
    operations: Arc<RwLock<OperationCounts>>,
    journal: Arc<RwLock<Vec<String>>>,
}

impl MockCluster {
    /// An empty cluster: no tools installed, nobody logged in
    pub fn new() -> Self {
        Self::default()
    }

    /// Tools installed and a session open, nothing deployed
    pub fn healthy(kube_bin: &str, helm_bin: &str) -> Self {
        Self::new()
            .with_tool(kube_bin, "Client Version: 4.16.0")
            .with_tool(helm_bin, "v3.15.2+g1a500d5")
            .with_user("developer")
    }

    pub fn with_tool(self, binary: &str, version: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .tools
            .insert(binary.to_string(), version.to_string());
        self
    }

    pub fn with_user(self, user: &str) -> Self {
        self.state.write().unwrap().user = Some(user.to_string());
        self
    }

    pub fn with_namespace(self, name: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .namespaces
            .insert(name.to_string());
        self
    }

    /// Pre-populate a release (its namespace is created too)
    pub fn with_release(self, record: ReleaseRecord) -> Self {
        {
            let mut state = self.state.write().unwrap();
            state.namespaces.insert(record.namespace.clone());
            state
                .releases
                .insert((record.namespace.clone(), record.name.clone()), record);
        }
        self
    }

    /// Pod snapshots served one per `list_pods` call; the last one repeats
    pub fn with_pod_snapshots(self, namespace: &str, snapshots: Vec<Vec<Pod>>) -> Self {
        self.state
            .write()
            .unwrap()
            .pod_script
            .insert(namespace.to_string(), snapshots.into());
        self
    }

    pub fn with_services(self, namespace: &str, services: Vec<Service>) -> Self {
        self.state
            .write()
            .unwrap()
            .services
            .insert(namespace.to_string(), services);
        self
    }

    pub fn with_endpoints(self, namespace: &str, endpoints: Vec<ExternalEndpoint>) -> Self {
        self.state
            .write()
            .unwrap()
            .endpoints
            .insert(namespace.to_string(), endpoints);
        self
    }

    /// Make an operation fail with the given message
    pub fn fail_on(self, point: FailPoint, message: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .failures
            .insert(point, message.to_string());
        self
    }

    /// Delay install and upgrade calls
    pub fn with_apply_delay(self, delay: Duration) -> Self {
        self.state.write().unwrap().apply_delay = Some(delay);
        self
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Mutations performed, in order
    pub fn journal(&self) -> Vec<String> {
        self.journal.read().unwrap().clone()
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.state.read().unwrap().namespaces.contains(name)
    }

    pub fn namespace_count(&self) -> usize {
        self.state.read().unwrap().namespaces.len()
    }

    pub fn release(&self, name: &str, namespace: &str) -> Option<ReleaseRecord> {
        self.state
            .read()
            .unwrap()
            .releases
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Parameters passed by the last successful install or upgrade
    pub fn applied_params(&self, name: &str, namespace: &str) -> Option<Values> {
        self.state
            .read()
            .unwrap()
            .applied_params
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    fn count(&self, f: impl FnOnce(&mut OperationCounts)) {
        f(&mut self.operations.write().unwrap());
    }

    fn record(&self, entry: String) {
        self.journal.write().unwrap().push(entry);
    }

    fn failure(&self, point: FailPoint) -> Option<String> {
        self.state.read().unwrap().failures.get(&point).cloned()
    }

    fn command_failed(&self, command: &str, message: String) -> RolloutError {
        RolloutError::CommandFailed {
            command: command.to_string(),
            code: Some(1),
            stderr: message,
        }
    }

    async fn apply_delay(&self) {
        let delay = self.state.read().unwrap().apply_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ClusterOps for MockCluster {
    async fn tool_available(&self, binary: &str) -> Result<Option<String>> {
        self.count(|c| c.tool_checks += 1);
        Ok(self.state.read().unwrap().tools.get(binary).cloned())
    }

    async fn current_user(&self) -> Result<Option<String>> {
        self.count(|c| c.user_checks += 1);
        Ok(self.state.read().unwrap().user.clone())
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        self.count(|c| c.namespace_queries += 1);
        if let Some(message) = self.failure(FailPoint::NamespaceQuery) {
            return Err(self.command_failed(&format!("get namespace {}", name), message));
        }
        Ok(self.has_namespace(name))
    }

    async fn create_namespace(&self, name: &str) -> Result<NamespaceOutcome> {
        self.count(|c| c.namespace_creates += 1);
        if let Some(message) = self.failure(FailPoint::CreateNamespace) {
            return Err(RolloutError::NamespaceFailed {
                name: name.to_string(),
                message,
            });
        }
        let created = self
            .state
            .write()
            .unwrap()
            .namespaces
            .insert(name.to_string());
        if created {
            self.record(format!("create-namespace {}", name));
            Ok(NamespaceOutcome::Created)
        } else {
            Ok(NamespaceOutcome::AlreadyExists)
        }
    }

    async fn delete_namespace(&self, name: &str) -> Result<bool> {
        self.count(|c| c.namespace_deletes += 1);
        if let Some(message) = self.failure(FailPoint::DeleteNamespace) {
            return Err(self.command_failed("delete namespace", message));
        }
        let removed = {
            let mut state = self.state.write().unwrap();
            let removed = state.namespaces.remove(name);
            state.releases.retain(|(ns, _), _| ns != name);
            removed
        };
        if removed {
            self.record(format!("delete-namespace {}", name));
        }
        Ok(removed)
    }

    async fn get_release(&self, name: &str, namespace: &str) -> Result<Option<ReleaseRecord>> {
        self.count(|c| c.release_gets += 1);
        if let Some(message) = self.failure(FailPoint::GetRelease) {
            return Err(self.command_failed("helm status", message));
        }
        Ok(self.release(name, namespace))
    }

    async fn install_release(
        &self,
        spec: &ReleaseSpec,
        _timeout: Duration,
    ) -> Result<ReleaseRecord> {
        self.count(|c| c.installs += 1);
        self.apply_delay().await;

        let apply_failed = |message: String| RolloutError::ApplyFailed {
            name: spec.name.clone(),
            namespace: spec.namespace.clone(),
            message,
        };
        if let Some(message) = self.failure(FailPoint::Install) {
            return Err(apply_failed(message));
        }

        let mut state = self.state.write().unwrap();
        if !state.namespaces.contains(&spec.namespace) {
            return Err(apply_failed(format!(
                "namespaces \"{}\" not found",
                spec.namespace
            )));
        }
        let key = (spec.namespace.clone(), spec.name.clone());
        if state.releases.contains_key(&key) {
            return Err(apply_failed(
                "cannot re-use a name that is still in use".to_string(),
            ));
        }

        let record = ReleaseRecord {
            name: spec.name.clone(),
            namespace: spec.namespace.clone(),
            revision: 1,
            status: ReleaseStatus::Deployed,
        };
        if let Some(params) = &spec.params {
            state.applied_params.insert(key.clone(), params.clone());
        }
        state.releases.insert(key, record.clone());
        drop(state);

        self.record(format!("install {}/{}", spec.namespace, spec.name));
        Ok(record)
    }

    async fn upgrade_release(
        &self,
        spec: &ReleaseSpec,
        _timeout: Duration,
    ) -> Result<ReleaseRecord> {
        self.count(|c| c.upgrades += 1);
        self.apply_delay().await;

        let apply_failed = |message: String| RolloutError::ApplyFailed {
            name: spec.name.clone(),
            namespace: spec.namespace.clone(),
            message,
        };
        if let Some(message) = self.failure(FailPoint::Upgrade) {
            return Err(apply_failed(message));
        }

        let mut state = self.state.write().unwrap();
        let key = (spec.namespace.clone(), spec.name.clone());
        let Some(existing) = state.releases.get_mut(&key) else {
            return Err(apply_failed(format!(
                "\"{}\" has no deployed releases",
                spec.name
            )));
        };
        existing.revision += 1;
        existing.status = ReleaseStatus::Deployed;
        let record = existing.clone();
        match &spec.params {
            Some(params) => state.applied_params.insert(key, params.clone()),
            None => state.applied_params.remove(&key),
        };
        drop(state);

        self.record(format!("upgrade {}/{}", spec.namespace, spec.name));
        Ok(record)
    }

    async fn uninstall_release(&self, name: &str, namespace: &str) -> Result<bool> {
        self.count(|c| c.uninstalls += 1);
        if let Some(message) = self.failure(FailPoint::Uninstall) {
            return Err(self.command_failed("helm uninstall", message));
        }
        let removed = self
            .state
            .write()
            .unwrap()
            .releases
            .remove(&(namespace.to_string(), name.to_string()))
            .is_some();
        if removed {
            self.record(format!("uninstall {}/{}", namespace, name));
        }
        Ok(removed)
    }

    async fn list_pods(&self, namespace: &str, selector: Option<&str>) -> Result<Vec<Pod>> {
        self.count(|c| c.pod_lists += 1);
        if let Some(message) = self.failure(FailPoint::ListPods) {
            return Err(self.command_failed("get pods", message));
        }

        let mut state = self.state.write().unwrap();
        let snapshot = match state.pod_script.get_mut(namespace) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap_or_default(),
            Some(script) => script.front().cloned().unwrap_or_default(),
            None => Vec::new(),
        };

        Ok(snapshot
            .into_iter()
            .filter(|pod| {
                selector.is_none_or(|s| selector_matches(s, pod.metadata.labels.as_ref()))
            })
            .collect())
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>> {
        self.count(|c| c.service_lists += 1);
        if let Some(message) = self.failure(FailPoint::ListServices) {
            return Err(self.command_failed("get services", message));
        }
        Ok(self
            .state
            .read()
            .unwrap()
            .services
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_external_endpoints(&self, namespace: &str) -> Result<Vec<ExternalEndpoint>> {
        self.count(|c| c.endpoint_lists += 1);
        if let Some(message) = self.failure(FailPoint::ListEndpoints) {
            return Err(self.command_failed("get routes", message));
        }
        Ok(self
            .state
            .read()
            .unwrap()
            .endpoints
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }
}

/// Equality-based label selector: `k=v`, `k==v`, `k!=v` or bare `k`,
/// comma separated
fn selector_matches(selector: &str, labels: Option<&BTreeMap<String, String>>) -> bool {
    let empty = BTreeMap::new();
    let labels = labels.unwrap_or(&empty);

    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| {
            if let Some((key, value)) = term.split_once("!=") {
                labels.get(key.trim()).map(String::as_str) != Some(value.trim())
            } else if let Some((key, value)) = term
                .split_once("==")
                .or_else(|| term.split_once('='))
            {
                labels.get(key.trim()).map(String::as_str) == Some(value.trim())
            } else {
                labels.contains_key(term)
            }
        })
}

fn labels_map(labels: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
    Some(
        labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

/// A running pod with a `Ready` condition
pub fn test_pod(name: &str, labels: &[(&str, &str)], ready: bool) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: labels_map(labels),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(if ready { "Running" } else { "Pending" }.to_string()),
            conditions: Some(vec![PodCondition {
                type_: "Ready".to_string(),
                status: if ready { "True" } else { "False" }.to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A pod of a finished job: phase `Succeeded`, `Ready=False`
pub fn completed_pod(name: &str, labels: &[(&str, &str)]) -> Pod {
    let mut pod = test_pod(name, labels, false);
    if let Some(status) = pod.status.as_mut() {
        status.phase = Some("Succeeded".to_string());
        if let Some(conditions) = status.conditions.as_mut() {
            conditions[0].reason = Some("PodCompleted".to_string());
        }
    }
    pod
}

/// A ClusterIP service exposing the given ports
pub fn test_service(name: &str, cluster_ip: &str, ports: &[i32]) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            cluster_ip: Some(cluster_ip.to_string()),
            ports: Some(
                ports
                    .iter()
                    .map(|port| ServicePort {
                        port: *port,
                        protocol: Some("TCP".to_string()),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}
