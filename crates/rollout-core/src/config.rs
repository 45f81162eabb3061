//! Orchestrator configuration
//!
//! Stored in `~/.config/rollout/config.yaml` unless `--config` names another
//! file. Every field has a default, so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::names::{DEFAULT_NAMESPACE, DEFAULT_RELEASE};

/// Rollout configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RolloutConfig {
    /// Release name
    pub release: String,

    /// Namespace used when none is given on the command line
    pub namespace: String,

    /// Chart directory or reference
    pub chart: String,

    /// Parameters file passed to the release when present
    pub values_file: PathBuf,

    /// Kubernetes CLI (`oc` on OpenShift, `kubectl` elsewhere)
    pub kube_bin: String,

    /// Helm CLI
    pub helm_bin: String,

    /// Upper bound for the cluster to accept an apply
    #[serde(with = "humantime_serde")]
    pub apply_timeout: Duration,

    /// Upper bound for workloads to become ready
    #[serde(with = "humantime_serde")]
    pub readiness_timeout: Duration,

    /// Delay between readiness polls
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Label selector for readiness; defaults to the release instance label
    pub selector: Option<String>,

    /// OpenAPI document uploaded to the edge security console
    pub api_spec: Option<PathBuf>,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            release: DEFAULT_RELEASE.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            chart: "deploy/helm/f5-ai-security".to_string(),
            values_file: PathBuf::from("deploy/helm/f5-ai-security/values.yaml"),
            kube_bin: "oc".to_string(),
            helm_bin: "helm".to_string(),
            apply_timeout: Duration::from_secs(600),
            readiness_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(5),
            selector: None,
            api_spec: None,
        }
    }
}

impl RolloutConfig {
    /// Load from an explicit path, or the default location if it exists
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file just means built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate(path)?;
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Get default configuration path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("rollout").join("config.yaml"))
    }

    /// Label selector used for readiness polling
    pub fn readiness_selector(&self) -> String {
        self.selector
            .clone()
            .unwrap_or_else(|| format!("app.kubernetes.io/instance={}", self.release))
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |message: &str| CoreError::InvalidConfig {
            path: path.display().to_string(),
            message: message.to_string(),
        };
        if self.poll_interval.is_zero() {
            return Err(invalid("pollInterval must be greater than zero"));
        }
        if self.kube_bin.trim().is_empty() || self.helm_bin.trim().is_empty() {
            return Err(invalid("kubeBin and helmBin must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RolloutConfig::default();
        assert_eq!(config.namespace, "f5-ai-security");
        assert_eq!(config.readiness_timeout, Duration::from_secs(300));
        assert_eq!(
            config.readiness_selector(),
            "app.kubernetes.io/instance=f5-ai-security"
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "kubeBin: kubectl\nreadinessTimeout: 2m\nselector: app=ui\n",
        )
        .unwrap();

        let config = RolloutConfig::load(Some(&path)).unwrap();
        assert_eq!(config.kube_bin, "kubectl");
        assert_eq!(config.readiness_timeout, Duration::from_secs(120));
        assert_eq!(config.readiness_selector(), "app=ui");
        assert_eq!(config.helm_bin, "helm");
    }

    #[test]
    fn test_empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(RolloutConfig::load_from(&path).unwrap(), RolloutConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = RolloutConfig::load(Some(&dir.path().join("nope.yaml")));
        assert!(matches!(result, Err(CoreError::Io(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "pollInterval: 0s\n").unwrap();
        let result = RolloutConfig::load_from(&path);
        assert!(matches!(result, Err(CoreError::InvalidConfig { .. })));
    }

    #[test]
    fn test_unknown_duration_format_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "applyTimeout: soon\n").unwrap();
        assert!(matches!(
            RolloutConfig::load_from(&path),
            Err(CoreError::YamlParse(_))
        ));
    }
}
