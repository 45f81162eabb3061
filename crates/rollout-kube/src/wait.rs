//! Readiness waiter
//!
//! Polls pods matching a label selector until every one of them is ready
//! or the time budget runs out. Readiness means:
//! - at least one pod matched
//! - every matched pod has condition `Ready=True`, or has `Succeeded`
//!   (pods of completed jobs)
//!
//! The loop never sleeps past its deadline and bounds each poll by the
//! time remaining, so the whole wait stays within `timeout`.

use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{Result, RolloutError};
use crate::ops::ClusterOps;

/// Default delay between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Observed readiness of a single pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodReadiness {
    pub name: String,
    pub phase: String,
    pub ready: bool,
    pub restarts: i32,
}

impl PodReadiness {
    pub fn from_pod(pod: &Pod) -> Self {
        let status = pod.status.as_ref();
        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            phase: status
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            ready: pod_is_ready(pod),
            restarts: status
                .and_then(|s| s.container_statuses.as_ref())
                .map(|cs| cs.iter().map(|c| c.restart_count).sum())
                .unwrap_or(0),
        }
    }
}

/// Whether a pod counts as ready
pub fn pod_is_ready(pod: &Pod) -> bool {
    let Some(status) = &pod.status else {
        return false;
    };
    if status.phase.as_deref() == Some("Succeeded") {
        return true;
    }
    status
        .conditions
        .iter()
        .flatten()
        .any(|c| c.type_ == "Ready" && c.status == "True")
}

/// "2/3 ready" style summary of a set of pods
pub fn summarize(pods: &[PodReadiness]) -> String {
    if pods.is_empty() {
        return "no pods matched".to_string();
    }
    let ready = pods.iter().filter(|p| p.ready).count();
    let pending: Vec<String> = pods
        .iter()
        .filter(|p| !p.ready)
        .map(|p| format!("{} ({})", p.name, p.phase))
        .collect();
    if pending.is_empty() {
        format!("{}/{} ready", ready, pods.len())
    } else {
        format!("{}/{} ready, waiting on {}", ready, pods.len(), pending.join(", "))
    }
}

/// One poll, as seen by a progress callback
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPoll<'a> {
    pub attempt: u32,
    pub elapsed: Duration,
    pub pods: &'a [PodReadiness],
    /// Set when the poll itself failed; counted as not ready
    pub error: Option<&'a str>,
}

/// Successful wait
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub pods: Vec<PodReadiness>,
    pub polls: u32,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl ReadinessReport {
    pub fn summary(&self) -> String {
        summarize(&self.pods)
    }
}

/// Fixed-interval readiness poller
#[derive(Debug, Clone, Copy)]
pub struct ReadinessWaiter {
    timeout: Duration,
    interval: Duration,
}

impl ReadinessWaiter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Wait for pods matching `selector` in `namespace`
    pub async fn wait<O, F>(
        &self,
        ops: &O,
        namespace: &str,
        selector: &str,
        mut on_poll: F,
    ) -> Result<ReadinessReport>
    where
        O: ClusterOps + ?Sized,
        F: FnMut(ReadinessPoll<'_>),
    {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let mut attempt = 0u32;
        let mut pods: Vec<PodReadiness> = Vec::new();

        loop {
            attempt += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());

            let listed =
                tokio::time::timeout(remaining, ops.list_pods(namespace, Some(selector))).await;
            let error = match listed {
                Ok(Ok(items)) => {
                    pods = items.iter().map(PodReadiness::from_pod).collect();
                    None
                }
                Ok(Err(e)) => {
                    tracing::warn!(namespace, "readiness poll failed: {}", e);
                    Some(e.to_string())
                }
                Err(_) => Some("poll did not complete before the deadline".to_string()),
            };

            let ready = error.is_none() && !pods.is_empty() && pods.iter().all(|p| p.ready);
            on_poll(ReadinessPoll {
                attempt,
                elapsed: start.elapsed(),
                pods: &pods,
                error: error.as_deref(),
            });
            tracing::debug!(attempt, ready, "{}", summarize(&pods));

            if ready {
                return Ok(ReadinessReport {
                    pods,
                    polls: attempt,
                    elapsed: start.elapsed(),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                let mut summary = summarize(&pods);
                if let Some(error) = error {
                    summary = format!("{}; last poll failed: {}", summary, error);
                }
                return Err(RolloutError::ReadinessTimeout {
                    namespace: namespace.to_string(),
                    selector: selector.to_string(),
                    timeout: self.timeout,
                    summary,
                    pods,
                });
            }

            tokio::time::sleep(self.interval.min(deadline - now)).await;
        }
    }
}

/// Wait with the default poll interval and no progress reporting
pub async fn wait_ready<O: ClusterOps + ?Sized>(
    ops: &O,
    selector: &str,
    namespace: &str,
    timeout: Duration,
) -> Result<ReadinessReport> {
    ReadinessWaiter::new(timeout)
        .wait(ops, namespace, selector, |_| {})
        .await
}
