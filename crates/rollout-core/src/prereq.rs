//! Prerequisite model
//!
//! A `PrerequisiteSet` is an ordered list of capability probes. Evaluation
//! needs the cluster capability and lives in `rollout-kube`; this module only
//! describes what to check and what to tell the operator when it fails.

use serde::Serialize;
use std::path::PathBuf;

/// What a check probes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Probe {
    /// A CLI tool is invocable
    Tool { binary: String },

    /// The cluster session is authenticated
    Authenticated,

    /// A file exists on disk
    File { path: PathBuf, role: FileRole },
}

/// What an optional file is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileRole {
    /// Release parameters merged under the overrides
    Values,

    /// OpenAPI document declared to the edge security console
    ApiSpec,
}

impl FileRole {
    /// What happens when the file is absent
    pub fn fallback(self) -> &'static str {
        match self {
            FileRole::Values => "using defaults",
            FileRole::ApiSpec => "the edge API definition was not verified",
        }
    }
}

/// Whether a failing check aborts the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Mandatory,
    Optional,
}

/// A single prerequisite
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    /// Short label shown to the operator
    pub name: String,

    /// The probe to run
    pub probe: Probe,

    /// Mandatory or optional
    pub requirement: Requirement,

    /// What to do when the check fails
    pub remediation: String,
}

impl Check {
    /// A mandatory tool check
    pub fn tool(binary: impl Into<String>, remediation: impl Into<String>) -> Self {
        let binary = binary.into();
        Self {
            name: format!("{} CLI", binary),
            probe: Probe::Tool { binary },
            requirement: Requirement::Mandatory,
            remediation: remediation.into(),
        }
    }

    /// A mandatory authenticated-session check
    pub fn authenticated(remediation: impl Into<String>) -> Self {
        Self {
            name: "cluster login".to_string(),
            probe: Probe::Authenticated,
            requirement: Requirement::Mandatory,
            remediation: remediation.into(),
        }
    }

    /// The optional release parameters file
    pub fn values_file(path: impl Into<PathBuf>) -> Self {
        Self::optional_file(
            "values file",
            path,
            FileRole::Values,
            "Copy the example values file and fill in your endpoints to override chart defaults",
        )
    }

    /// The optional OpenAPI document for the edge console
    pub fn api_spec(path: impl Into<PathBuf>) -> Self {
        Self::optional_file(
            "edge API spec",
            path,
            FileRole::ApiSpec,
            "Export the chat API's OpenAPI document and upload it to the edge API security \
             policy; requests to undeclared paths are blocked with 403",
        )
    }

    fn optional_file(
        name: &str,
        path: impl Into<PathBuf>,
        role: FileRole,
        remediation: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            probe: Probe::File {
                path: path.into(),
                role,
            },
            requirement: Requirement::Optional,
            remediation: remediation.to_string(),
        }
    }

    pub fn is_mandatory(&self) -> bool {
        self.requirement == Requirement::Mandatory
    }
}

/// Result of evaluating one check
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub check: Check,
    pub passed: bool,
    /// Probe output worth showing (logged-in user, tool error, ...)
    pub detail: Option<String>,
}

/// Ordered list of checks
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrerequisiteSet {
    checks: Vec<Check>,
}

impl PrerequisiteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a check; evaluation follows insertion order
    pub fn push(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Tools and login only, used before teardown
    pub fn cluster_access(kube_bin: &str, helm_bin: &str) -> Self {
        Self::new()
            .push(Check::tool(
                kube_bin,
                format!(
                    "Install the {} CLI and make sure it is on your PATH",
                    kube_bin
                ),
            ))
            .push(Check::tool(
                helm_bin,
                "Install Helm 3: https://helm.sh/docs/intro/install/",
            ))
            .push(Check::authenticated(login_hint(kube_bin)))
    }

    /// The deploy prerequisites: cluster access plus the optional files
    pub fn standard(
        kube_bin: &str,
        helm_bin: &str,
        values_file: Option<PathBuf>,
        api_spec: Option<PathBuf>,
    ) -> Self {
        let checks = values_file
            .map(Check::values_file)
            .into_iter()
            .chain(api_spec.map(Check::api_spec));
        checks.fold(Self::cluster_access(kube_bin, helm_bin), Self::push)
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

fn login_hint(kube_bin: &str) -> String {
    let is_oc = std::path::Path::new(kube_bin)
        .file_name()
        .is_some_and(|f| f == "oc");
    if is_oc {
        format!(
            "Log in to the cluster first, e.g. `{} login --token=<token> --server=<api-url>`",
            kube_bin
        )
    } else {
        format!(
            "Point your kubeconfig at the cluster, e.g. `{} config use-context <context>`",
            kube_bin
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_order() {
        let set = PrerequisiteSet::standard(
            "oc",
            "helm",
            Some(PathBuf::from("values.yaml")),
            Some(PathBuf::from("openapi.json")),
        );
        let probes: Vec<_> = set.checks().iter().map(|c| c.probe.clone()).collect();

        assert_eq!(
            probes,
            vec![
                Probe::Tool {
                    binary: "oc".into()
                },
                Probe::Tool {
                    binary: "helm".into()
                },
                Probe::Authenticated,
                Probe::File {
                    path: PathBuf::from("values.yaml"),
                    role: FileRole::Values,
                },
                Probe::File {
                    path: PathBuf::from("openapi.json"),
                    role: FileRole::ApiSpec,
                },
            ]
        );
    }

    #[test]
    fn test_values_file_is_optional() {
        let set = PrerequisiteSet::standard("oc", "helm", Some(PathBuf::from("values.yaml")), None);
        assert_eq!(set.len(), 4);
        let last = set.checks().last().unwrap();
        assert!(!last.is_mandatory());
        assert!(set.checks()[..3].iter().all(Check::is_mandatory));
    }

    #[test]
    fn test_api_spec_check() {
        let set = PrerequisiteSet::standard("oc", "helm", None, Some(PathBuf::from("openapi.json")));
        assert_eq!(set.len(), 4);
        let check = &set.checks()[3];
        assert_eq!(check.name, "edge API spec");
        assert!(!check.is_mandatory());
        assert!(check.remediation.contains("403"));
        assert_eq!(FileRole::ApiSpec.fallback(), "the edge API definition was not verified");
    }

    #[test]
    fn test_oc_login_hint() {
        let set = PrerequisiteSet::cluster_access("/usr/local/bin/oc", "helm");
        assert!(set.checks()[2].remediation.contains("oc login"));
    }

    #[test]
    fn test_cluster_access_has_no_file_check() {
        let set = PrerequisiteSet::cluster_access("kubectl", "helm");
        assert_eq!(set.len(), 3);
        assert!(set.checks()[2].remediation.contains("kubectl config use-context"));
    }
}
