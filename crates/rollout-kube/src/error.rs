//! Error types for rollout-kube

use rollout_core::CoreError;
use std::time::Duration;
use thiserror::Error;

use crate::wait::PodReadiness;

/// Result type for rollout-kube operations
pub type Result<T> = std::result::Result<T, RolloutError>;

/// Errors that can occur while rolling out or tearing down
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RolloutError {
    /// A mandatory tool or login is missing; nothing was changed
    #[error("prerequisite '{check}' not met{}", .detail.as_ref().map(|d| format!(": {}", d)).unwrap_or_default())]
    PrerequisiteMissing {
        check: String,
        detail: Option<String>,
        remediation: String,
    },

    /// An optional configuration file is absent; the run goes on without it
    #[error("configuration file {path} not found, {fallback}")]
    ConfigurationMissing {
        path: String,
        fallback: String,
        remediation: String,
    },

    /// Namespace could not be created
    #[error("failed to provision namespace '{name}': {message}")]
    NamespaceFailed { name: String, message: String },

    /// The cluster rejected the release
    #[error("failed to apply release '{name}' in namespace '{namespace}': {message}")]
    ApplyFailed {
        name: String,
        namespace: String,
        message: String,
    },

    /// The cluster did not accept the release in time
    #[error("applying release '{name}' in namespace '{namespace}' timed out after {}", humanize(.timeout))]
    ApplyTimeout {
        name: String,
        namespace: String,
        timeout: Duration,
    },

    /// Workloads were accepted but did not become ready in time
    #[error("resources matching '{selector}' in namespace '{namespace}' not ready after {}: {summary}", humanize(.timeout))]
    ReadinessTimeout {
        namespace: String,
        selector: String,
        timeout: Duration,
        summary: String,
        /// Last observed per-pod readiness
        pods: Vec<PodReadiness>,
    },

    /// Teardown of an existing release or namespace failed
    #[error("failed to remove {target}: {message}")]
    RemovalFailed { target: String, message: String },

    /// An external command exited unsuccessfully
    #[error("`{command}` failed{}: {stderr}", .code.map(|c| format!(" with exit code {}", c)).unwrap_or_default())]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// An external command could not be started
    #[error("failed to run `{program}`: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Command output did not have the expected shape
    #[error("unexpected output from {what}: {message}")]
    Parse { what: String, message: String },

    /// Endpoint probe could not be set up
    #[error("probe error: {0}")]
    Probe(String),

    /// Core error (values, names, configuration)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RolloutError {
    /// Whether this error aborts the pipeline
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RolloutError::ConfigurationMissing { .. } | RolloutError::ReadinessTimeout { .. }
        )
    }

    /// What the operator should check or run next
    pub fn remediation(&self) -> Option<String> {
        match self {
            RolloutError::PrerequisiteMissing { remediation, .. } => Some(remediation.clone()),
            RolloutError::ConfigurationMissing { remediation, .. } => Some(remediation.clone()),
            RolloutError::NamespaceFailed { name, .. } => Some(format!(
                "Check that your account may create namespaces, or create '{}' manually",
                name
            )),
            RolloutError::ApplyFailed { name, namespace, .. } => Some(format!(
                "Inspect the partial release with `helm status {} -n {}` and `oc get events -n {}`; \
                 nothing was rolled back",
                name, namespace, namespace
            )),
            RolloutError::ApplyTimeout { name, namespace, .. } => Some(format!(
                "The release may be partially applied. Inspect it with `helm status {} -n {}` \
                 and retry with a larger --timeout",
                name, namespace
            )),
            RolloutError::ReadinessTimeout { namespace, .. } => Some(format!(
                "Check pod events with `oc get pods -n {} && oc describe pods -n {}`",
                namespace, namespace
            )),
            RolloutError::RemovalFailed { .. } => Some(
                "Re-run the teardown, or remove the remaining resources manually".to_string(),
            ),
            RolloutError::CommandSpawn { program, .. } => {
                Some(format!("Make sure `{}` is installed and on your PATH", program))
            }
            RolloutError::CommandFailed { command, .. } => Some(format!(
                "Run `{}` yourself to see the full error. Check the session with `oc whoami` \
                 (or `kubectl auth whoami`) and that your account's RBAC role allows the operation",
                command
            )),
            RolloutError::Parse { what, .. } => Some(format!(
                "The {} output was not in the expected format. Check that your CLI versions are \
                 supported with `helm version` and `oc version --client` (or `kubectl version --client`)",
                what
            )),
            RolloutError::Probe(_) => {
                Some("Pass a full http(s) base URL, e.g. https://chat.example.com/v1".to_string())
            }
            RolloutError::Core(core) => Some(core_remediation(core)),
            RolloutError::Io(_) => Some(
                "Check that the file exists and is readable, and that the temporary directory \
                 is writable"
                    .to_string(),
            ),
        }
    }

    pub(crate) fn parse(what: impl Into<String>, message: impl std::fmt::Display) -> Self {
        RolloutError::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }
}

impl serde::Serialize for RolloutError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

fn core_remediation(err: &CoreError) -> String {
    match err {
        CoreError::InvalidName { kind, .. } => format!(
            "Use a {} name of lowercase letters, digits and '-' that starts and ends with \
             a letter or digit, e.g. 'team-a'",
            kind
        ),
        CoreError::InvalidConfig { path, .. } => {
            format!("Fix {} or point --config at another file", path)
        }
        CoreError::ValuesMerge { .. } => {
            "Check the values file and every --set argument (key=value)".to_string()
        }
        CoreError::YamlParse(_) | CoreError::JsonParse(_) => {
            "Check that the values and configuration files are valid YAML".to_string()
        }
        CoreError::Io(_) => "Check that the file exists and is readable".to_string(),
    }
}

fn humanize(d: &Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", d.as_millis())
    }
}
