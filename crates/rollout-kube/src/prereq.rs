//! Prerequisite checker
//!
//! Evaluates a [`PrerequisiteSet`] against the cluster. Read-only: no
//! check mutates anything.

use rollout_core::{Check, CheckOutcome, FileRole, PrerequisiteSet, Probe, Requirement};
use serde::Serialize;
use std::path::PathBuf;

use crate::error::{Result, RolloutError};
use crate::ops::ClusterOps;

/// Result of a successful prerequisite run
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteReport {
    /// Every check that was run, in order
    pub outcomes: Vec<CheckOutcome>,

    /// Non-fatal problems (failed optional checks)
    pub warnings: Vec<RolloutError>,

    /// The values file, when the optional file check found it
    pub values_file: Option<PathBuf>,

    /// The edge API spec, when the optional file check found it
    pub api_spec: Option<PathBuf>,
}

impl PrerequisiteReport {
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }
}

/// Run checks in order, stopping at the first failing mandatory check
///
/// A failed optional file check produces a `ConfigurationMissing` warning
/// and leaves the matching path unset.
pub async fn check_all<O: ClusterOps + ?Sized>(
    ops: &O,
    set: &PrerequisiteSet,
) -> Result<PrerequisiteReport> {
    let mut report = PrerequisiteReport::default();

    for check in set.checks() {
        let outcome = run_check(ops, check).await?;
        let passed = outcome.passed;
        let detail = outcome.detail.clone();
        report.outcomes.push(outcome);

        match (passed, check.requirement, &check.probe) {
            (true, _, Probe::File { path, role }) => match role {
                FileRole::Values => report.values_file = Some(path.clone()),
                FileRole::ApiSpec => report.api_spec = Some(path.clone()),
            },
            (true, _, _) => {}
            (false, Requirement::Mandatory, _) => {
                tracing::debug!(check = %check.name, "mandatory prerequisite failed");
                return Err(RolloutError::PrerequisiteMissing {
                    check: check.name.clone(),
                    detail,
                    remediation: check.remediation.clone(),
                });
            }
            (false, Requirement::Optional, Probe::File { path, role }) => {
                tracing::warn!(
                    "{} not found at {}, {}",
                    check.name,
                    path.display(),
                    role.fallback()
                );
                report.warnings.push(RolloutError::ConfigurationMissing {
                    path: path.display().to_string(),
                    fallback: role.fallback().to_string(),
                    remediation: check.remediation.clone(),
                });
            }
            (false, Requirement::Optional, _) => {
                tracing::warn!(check = %check.name, "optional prerequisite failed");
            }
        }
    }

    Ok(report)
}

/// Run every check regardless of failures, for display
pub async fn evaluate<O: ClusterOps + ?Sized>(
    ops: &O,
    set: &PrerequisiteSet,
) -> Result<Vec<CheckOutcome>> {
    let mut outcomes = Vec::with_capacity(set.len());
    for check in set.checks() {
        outcomes.push(run_check(ops, check).await?);
    }
    Ok(outcomes)
}

async fn run_check<O: ClusterOps + ?Sized>(ops: &O, check: &Check) -> Result<CheckOutcome> {
    let (passed, detail) = match &check.probe {
        Probe::Tool { binary } => match ops.tool_available(binary).await? {
            Some(version) => (true, Some(version)),
            None => (false, Some(format!("`{}` not found or not runnable", binary))),
        },
        Probe::Authenticated => match ops.current_user().await? {
            Some(user) => (true, Some(format!("logged in as {}", user))),
            None => (false, Some("not logged in to a cluster".to_string())),
        },
        Probe::File { path, .. } => {
            if path.is_file() {
                (true, Some(path.display().to_string()))
            } else {
                (false, Some(format!("{} does not exist", path.display())))
            }
        }
    };

    Ok(CheckOutcome {
        check: check.clone(),
        passed,
        detail,
    })
}
