//! Cluster operations backed by the `oc`/`kubectl` and `helm` CLIs
//!
//! Commands run through `tokio::process` with stdin closed and
//! `kill_on_drop`, so a caller that gives up on a future (the applier's
//! timeout) also stops the child process. JSON output is parsed into
//! k8s-openapi types where one exists.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use rollout_core::{ReleaseSpec, ReleaseStatus, Values};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{Result, RolloutError};
use crate::ops::{ClusterOps, ExternalEndpoint, NamespaceOutcome, ReleaseRecord};

/// Which dialect of the kube CLI is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterFlavor {
    /// `oc`: projects, routes, `oc whoami`
    OpenShift,
    /// `kubectl`: namespaces, ingresses, `kubectl auth whoami`
    Kubernetes,
}

impl ClusterFlavor {
    /// Guess the flavor from the kube CLI binary name
    pub fn detect(kube_bin: &str) -> Self {
        let is_oc = std::path::Path::new(kube_bin)
            .file_name()
            .is_some_and(|f| f == "oc");
        if is_oc {
            Self::OpenShift
        } else {
            Self::Kubernetes
        }
    }
}

/// Captured output of a finished command
#[derive(Debug)]
struct CommandOutput {
    command: String,
    stdout: String,
    stderr: String,
    code: Option<i32>,
}

impl CommandOutput {
    fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn into_error(self) -> RolloutError {
        RolloutError::CommandFailed {
            command: self.command,
            code: self.code,
            stderr: self.stderr.trim().to_string(),
        }
    }
}

/// Real cluster access through external CLIs
#[derive(Debug, Clone)]
pub struct ShellCluster {
    kube_bin: String,
    helm_bin: String,
    flavor: ClusterFlavor,
}

impl ShellCluster {
    /// Create a shell-backed cluster; the flavor is detected from `kube_bin`
    pub fn new(kube_bin: impl Into<String>, helm_bin: impl Into<String>) -> Self {
        let kube_bin = kube_bin.into();
        let flavor = ClusterFlavor::detect(&kube_bin);
        Self {
            kube_bin,
            helm_bin: helm_bin.into(),
            flavor,
        }
    }

    /// Override the detected flavor
    pub fn with_flavor(mut self, flavor: ClusterFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn flavor(&self) -> ClusterFlavor {
        self.flavor
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let command = display_command(program, args);
        tracing::debug!(%command, "running");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RolloutError::CommandSpawn {
                program: program.to_string(),
                source,
            })?;

        let out = CommandOutput {
            command,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        };
        if !out.success() {
            tracing::debug!(
                command = %out.command,
                code = ?out.code,
                stderr = %out.stderr.trim(),
                "command failed"
            );
        }
        Ok(out)
    }

    async fn kube(&self, args: &[&str]) -> Result<CommandOutput> {
        self.run(&self.kube_bin, &owned(args)).await
    }

    async fn kube_json<T: DeserializeOwned>(&self, what: &str, args: &[&str]) -> Result<T> {
        let out = self.kube(args).await?;
        if !out.success() {
            return Err(out.into_error());
        }
        serde_json::from_str(&out.stdout).map_err(|e| RolloutError::parse(what, e))
    }

    async fn helm_apply(
        &self,
        verb: &str,
        spec: &ReleaseSpec,
        timeout: Duration,
    ) -> Result<ReleaseRecord> {
        // Held until helm exits; the file is removed on drop
        let values_file = match &spec.params {
            Some(params) if !params.is_empty() => Some(write_values_file(params)?),
            _ => None,
        };

        let mut args = owned(&[verb, &spec.name]);
        args.push(spec.chart.as_arg());
        args.extend(owned(&["--namespace", &spec.namespace]));
        args.extend(["--timeout".to_string(), helm_duration(timeout)]);
        args.extend(owned(&["--output", "json"]));
        if let Some(file) = &values_file {
            args.push("--values".to_string());
            args.push(file.path().display().to_string());
        }

        let out = self.run(&self.helm_bin, &args).await?;
        if !out.success() {
            return Err(RolloutError::ApplyFailed {
                name: spec.name.clone(),
                namespace: spec.namespace.clone(),
                message: out.stderr.trim().to_string(),
            });
        }
        parse_helm_release(&out.stdout)
    }
}

#[async_trait]
impl ClusterOps for ShellCluster {
    async fn tool_available(&self, binary: &str) -> Result<Option<String>> {
        let args: &[&str] = if binary == self.helm_bin {
            &["version", "--short"]
        } else {
            &["version", "--client"]
        };

        match self.run(binary, &owned(args)).await {
            Ok(out) if out.success() => Ok(Some(
                out.stdout
                    .lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .unwrap_or(binary)
                    .to_string(),
            )),
            Ok(_) => Ok(None),
            Err(RolloutError::CommandSpawn { source, .. }) => {
                tracing::debug!("{} not invocable: {}", binary, source);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn current_user(&self) -> Result<Option<String>> {
        let result = match self.flavor {
            ClusterFlavor::OpenShift => self.kube(&["whoami"]).await,
            ClusterFlavor::Kubernetes => {
                self.kube(&[
                    "auth",
                    "whoami",
                    "-o",
                    "jsonpath={.status.userInfo.username}",
                ])
                .await
            }
        };
        let out = match result {
            Ok(out) => out,
            Err(RolloutError::CommandSpawn { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let user = out.stdout.trim();
        if out.success() && !user.is_empty() {
            Ok(Some(user.to_string()))
        } else {
            Ok(None)
        }
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        let out = self.kube(&["get", "namespace", name, "-o", "name"]).await?;
        if out.success() {
            Ok(true)
        } else if is_not_found(&out.stderr) {
            Ok(false)
        } else {
            Err(out.into_error())
        }
    }

    async fn create_namespace(&self, name: &str) -> Result<NamespaceOutcome> {
        let out = match self.flavor {
            ClusterFlavor::OpenShift => self.kube(&["new-project", name]).await?,
            ClusterFlavor::Kubernetes => self.kube(&["create", "namespace", name]).await?,
        };
        if out.success() {
            Ok(NamespaceOutcome::Created)
        } else if is_already_exists(&out.stderr) {
            Ok(NamespaceOutcome::AlreadyExists)
        } else {
            Err(RolloutError::NamespaceFailed {
                name: name.to_string(),
                message: out.stderr.trim().to_string(),
            })
        }
    }

    async fn delete_namespace(&self, name: &str) -> Result<bool> {
        let out = match self.flavor {
            ClusterFlavor::OpenShift => self.kube(&["delete", "project", name]).await?,
            ClusterFlavor::Kubernetes => self.kube(&["delete", "namespace", name]).await?,
        };
        if out.success() {
            Ok(true)
        } else if is_not_found(&out.stderr) {
            Ok(false)
        } else {
            Err(out.into_error())
        }
    }

    async fn get_release(&self, name: &str, namespace: &str) -> Result<Option<ReleaseRecord>> {
        let args = owned(&["status", name, "--namespace", namespace, "--output", "json"]);
        let out = self.run(&self.helm_bin, &args).await?;
        if out.success() {
            parse_helm_release(&out.stdout).map(Some)
        } else if is_not_found(&out.stderr) {
            Ok(None)
        } else {
            Err(out.into_error())
        }
    }

    async fn install_release(
        &self,
        spec: &ReleaseSpec,
        timeout: Duration,
    ) -> Result<ReleaseRecord> {
        self.helm_apply("install", spec, timeout).await
    }

    async fn upgrade_release(
        &self,
        spec: &ReleaseSpec,
        timeout: Duration,
    ) -> Result<ReleaseRecord> {
        self.helm_apply("upgrade", spec, timeout).await
    }

    async fn uninstall_release(&self, name: &str, namespace: &str) -> Result<bool> {
        let args = owned(&["uninstall", name, "--namespace", namespace]);
        let out = self.run(&self.helm_bin, &args).await?;
        if out.success() {
            Ok(true)
        } else if is_not_found(&out.stderr) {
            Ok(false)
        } else {
            Err(out.into_error())
        }
    }

    async fn list_pods(&self, namespace: &str, selector: Option<&str>) -> Result<Vec<Pod>> {
        let mut args = vec!["get", "pods", "--namespace", namespace, "-o", "json"];
        if let Some(sel) = selector {
            args.extend(["--selector", sel]);
        }
        let list: ItemList<Pod> = self.kube_json("pod list", &args).await?;
        Ok(list.items)
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>> {
        let list: ItemList<Service> = self
            .kube_json(
                "service list",
                &["get", "services", "--namespace", namespace, "-o", "json"],
            )
            .await?;
        Ok(list.items)
    }

    async fn list_external_endpoints(&self, namespace: &str) -> Result<Vec<ExternalEndpoint>> {
        match self.flavor {
            ClusterFlavor::OpenShift => {
                let list: ItemList<Route> = self
                    .kube_json(
                        "route list",
                        &["get", "routes", "--namespace", namespace, "-o", "json"],
                    )
                    .await?;
                Ok(routes_to_endpoints(list.items))
            }
            ClusterFlavor::Kubernetes => {
                let list: ItemList<Ingress> = self
                    .kube_json(
                        "ingress list",
                        &["get", "ingresses", "--namespace", namespace, "-o", "json"],
                    )
                    .await?;
                Ok(ingresses_to_endpoints(&list.items))
            }
        }
    }
}

/// `items` of a `kubectl get -o json` list
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ItemList<T> {
    #[serde(default)]
    items: Vec<T>,
}

/// The fields of an OpenShift Route that matter for reporting
#[derive(Debug, Deserialize)]
struct Route {
    metadata: RouteMetadata,
    spec: RouteSpec,
}

#[derive(Debug, Deserialize)]
struct RouteMetadata {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RouteSpec {
    #[serde(default)]
    host: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    tls: Option<serde_json::Value>,
}

/// `helm status -o json` / `helm install -o json`
#[derive(Debug, Deserialize)]
struct HelmRelease {
    name: String,
    namespace: String,
    version: u32,
    info: HelmInfo,
}

#[derive(Debug, Deserialize)]
struct HelmInfo {
    #[serde(default)]
    status: String,
}

fn parse_helm_release(stdout: &str) -> Result<ReleaseRecord> {
    let release: HelmRelease =
        serde_json::from_str(stdout.trim()).map_err(|e| RolloutError::parse("helm", e))?;
    Ok(ReleaseRecord {
        name: release.name,
        namespace: release.namespace,
        revision: release.version,
        status: ReleaseStatus::from_helm(&release.info.status),
    })
}

fn routes_to_endpoints(routes: Vec<Route>) -> Vec<ExternalEndpoint> {
    routes
        .into_iter()
        .filter(|r| !r.spec.host.is_empty())
        .map(|r| ExternalEndpoint {
            kind: "Route".to_string(),
            name: r.metadata.name,
            host: r.spec.host,
            path: r.spec.path.filter(|p| !p.is_empty()),
            tls: r.spec.tls.is_some_and(|t| !t.is_null()),
        })
        .collect()
}

fn ingresses_to_endpoints(ingresses: &[Ingress]) -> Vec<ExternalEndpoint> {
    let mut endpoints = Vec::new();
    for ingress in ingresses {
        let name = ingress.metadata.name.clone().unwrap_or_default();
        let Some(spec) = &ingress.spec else { continue };

        let tls_hosts: Vec<&String> = spec
            .tls
            .iter()
            .flatten()
            .flat_map(|t| t.hosts.iter().flatten())
            .collect();

        for rule in spec.rules.iter().flatten() {
            let Some(host) = rule.host.clone().filter(|h| !h.is_empty()) else {
                continue;
            };
            let tls = tls_hosts.iter().any(|h| **h == host);
            let paths: Vec<Option<String>> = rule
                .http
                .as_ref()
                .map(|http| http.paths.iter().map(|p| p.path.clone()).collect())
                .unwrap_or_else(|| vec![None]);

            for path in paths {
                endpoints.push(ExternalEndpoint {
                    kind: "Ingress".to_string(),
                    name: name.clone(),
                    host: host.clone(),
                    path: path.filter(|p| !p.is_empty() && p != "/"),
                    tls,
                });
            }
        }
    }
    endpoints
}

fn write_values_file(values: &Values) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("rollout-values-")
        .suffix(".yaml")
        .tempfile()?;
    file.write_all(values.to_yaml()?.as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn helm_duration(timeout: Duration) -> String {
    format!("{}s", timeout.as_secs().max(1))
}

fn is_not_found(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("notfound") || lower.contains("not found")
}

fn is_already_exists(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("alreadyexists") || lower.contains("already exists")
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}
