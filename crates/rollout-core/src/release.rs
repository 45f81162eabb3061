//! Release types: the intent handed to the applier and what comes back

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::values::Values;

/// Where the release's resource templates come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartSource {
    /// Chart directory on the local filesystem
    Path(PathBuf),

    /// Anything helm resolves itself (`repo/chart`, `oci://...`)
    Reference(String),
}

impl ChartSource {
    /// Build a source from operator input, preferring an existing local path
    pub fn parse(input: &str) -> Self {
        let path = PathBuf::from(input);
        if path.exists() || input.starts_with('.') || input.starts_with('/') {
            Self::Path(path)
        } else {
            Self::Reference(input.to_string())
        }
    }

    /// Argument form passed to helm
    pub fn as_arg(&self) -> String {
        match self {
            Self::Path(p) => p.display().to_string(),
            Self::Reference(r) => r.clone(),
        }
    }
}

impl std::fmt::Display for ChartSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_arg())
    }
}

/// A release to apply: identity plus resolved parameters
#[derive(Debug, Clone)]
pub struct ReleaseSpec {
    /// Release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Template source
    pub chart: ChartSource,

    /// Resolved parameters; `None` means chart defaults
    pub params: Option<Values>,
}

impl ReleaseSpec {
    /// Create a spec that uses chart defaults
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, chart: ChartSource) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            chart,
            params: None,
        }
    }

    /// Attach resolved parameters
    pub fn with_params(mut self, params: Values) -> Self {
        self.params = Some(params);
        self
    }

    /// Whether chart defaults will be used as-is
    pub fn uses_defaults(&self) -> bool {
        self.params.as_ref().is_none_or(Values::is_empty)
    }
}

/// Whether an apply created the release or upgraded it in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyAction {
    Installed,
    Upgraded,
}

impl std::fmt::Display for ApplyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installed => write!(f, "installed"),
            Self::Upgraded => write!(f, "upgraded"),
        }
    }
}

/// Result of applying a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseHandle {
    /// Release name
    pub name: String,

    /// Namespace the release lives in
    pub namespace: String,

    /// Revision number after the apply
    pub revision: u32,

    /// Install or upgrade
    pub action: ApplyAction,

    /// Status reported by the cluster
    pub status: ReleaseStatus,
}

/// Release status
///
/// Note: This enum is non-exhaustive - new variants may be added in future versions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ReleaseStatus {
    #[default]
    Unknown,
    Deployed,
    Uninstalled,
    Superseded,
    Failed,
    Uninstalling,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
}

impl ReleaseStatus {
    /// Parse helm's status string; anything unrecognised is `Unknown`
    pub fn from_helm(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "deployed" => Self::Deployed,
            "uninstalled" => Self::Uninstalled,
            "superseded" => Self::Superseded,
            "failed" => Self::Failed,
            "uninstalling" => Self::Uninstalling,
            "pending-install" => Self::PendingInstall,
            "pending-upgrade" => Self::PendingUpgrade,
            "pending-rollback" => Self::PendingRollback,
            _ => Self::Unknown,
        }
    }

    /// Whether the release is mid-operation
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::PendingInstall | Self::PendingUpgrade | Self::PendingRollback | Self::Uninstalling
        )
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Deployed => "deployed",
            Self::Uninstalled => "uninstalled",
            Self::Superseded => "superseded",
            Self::Failed => "failed",
            Self::Uninstalling => "uninstalling",
            Self::PendingInstall => "pending-install",
            Self::PendingUpgrade => "pending-upgrade",
            Self::PendingRollback => "pending-rollback",
        };
        write!(f, "{}", s)
    }
}
