//! Status reporter
//!
//! Read-only snapshot of what runs in a namespace. Each section is read
//! independently and carries either its rows or the error that prevented
//! reading it, so a snapshot is always produced.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Pod, Service};
use serde::Serialize;

use crate::ops::{ClusterOps, ExternalEndpoint};
use crate::wait::PodReadiness;

/// Rows of one section, or why they could not be read
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Section<T> {
    Rows(Vec<T>),
    Unavailable(String),
}

impl<T> Section<T> {
    fn from_result<S>(result: crate::error::Result<Vec<S>>, map: impl Fn(S) -> T) -> Self {
        match result {
            Ok(items) => Section::Rows(items.into_iter().map(map).collect()),
            Err(e) => Section::Unavailable(e.to_string()),
        }
    }

    pub fn rows(&self) -> Option<&[T]> {
        match self {
            Section::Rows(rows) => Some(rows),
            Section::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Section::Rows(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodRow {
    pub name: String,
    pub phase: String,
    /// Ready containers over total, e.g. `1/2`
    pub ready: String,
    pub restarts: i32,
    pub age: Option<String>,
}

impl PodRow {
    fn from_pod(pod: Pod, now: DateTime<Utc>) -> Self {
        let readiness = PodReadiness::from_pod(&pod);
        let containers = pod
            .status
            .as_ref()
            .and_then(|s| s.container_statuses.as_ref());
        let ready = match containers {
            Some(cs) if !cs.is_empty() => {
                format!("{}/{}", cs.iter().filter(|c| c.ready).count(), cs.len())
            }
            _ => if readiness.ready { "1/1" } else { "0/1" }.to_string(),
        };
        let age = pod
            .metadata
            .creation_timestamp
            .as_ref()
            .map(|t| format_age(now.signed_duration_since(t.0)));

        Self {
            name: readiness.name,
            phase: readiness.phase,
            ready,
            restarts: readiness.restarts,
            age,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRow {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub cluster_ip: String,
    /// `port/protocol` pairs, comma separated
    pub ports: String,
}

impl From<Service> for ServiceRow {
    fn from(svc: Service) -> Self {
        let spec = svc.spec.unwrap_or_default();
        let ports = spec
            .ports
            .unwrap_or_default()
            .iter()
            .map(|p| format!("{}/{}", p.port, p.protocol.as_deref().unwrap_or("TCP")))
            .collect::<Vec<_>>()
            .join(",");
        Self {
            name: svc.metadata.name.unwrap_or_default(),
            type_: spec.type_.unwrap_or_else(|| "ClusterIP".to_string()),
            cluster_ip: spec.cluster_ip.unwrap_or_else(|| "None".to_string()),
            ports,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRow {
    pub kind: String,
    pub name: String,
    pub url: String,
}

impl From<ExternalEndpoint> for EndpointRow {
    fn from(ep: ExternalEndpoint) -> Self {
        let url = ep.url();
        Self {
            kind: ep.kind,
            name: ep.name,
            url,
        }
    }
}

/// Point-in-time view of a namespace
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub namespace: String,
    pub taken_at: DateTime<Utc>,
    pub pods: Section<PodRow>,
    pub services: Section<ServiceRow>,
    pub endpoints: Section<EndpointRow>,
}

impl Snapshot {
    /// First externally reachable URL, if any
    pub fn first_url(&self) -> Option<&str> {
        self.endpoints
            .rows()
            .and_then(|rows| rows.first())
            .map(|row| row.url.as_str())
    }
}

/// Read pods, services and external endpoints of `namespace`
pub async fn report<O: ClusterOps + ?Sized>(ops: &O, namespace: &str) -> Snapshot {
    let (pods, services, endpoints) = tokio::join!(
        ops.list_pods(namespace, None),
        ops.list_services(namespace),
        ops.list_external_endpoints(namespace),
    );
    let now = Utc::now();

    let snapshot = Snapshot {
        namespace: namespace.to_string(),
        taken_at: now,
        pods: Section::from_result(pods, |p| PodRow::from_pod(p, now)),
        services: Section::from_result(services, ServiceRow::from),
        endpoints: Section::from_result(endpoints, EndpointRow::from),
    };
    for (name, available) in [
        ("pods", snapshot.pods.is_available()),
        ("services", snapshot.services.is_available()),
        ("endpoints", snapshot.endpoints.is_available()),
    ] {
        if !available {
            tracing::warn!(namespace, section = name, "could not read section");
        }
    }
    snapshot
}

fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        s if s < 120 => format!("{}s", s),
        s if s < 2 * 3600 => format!("{}m", s / 60),
        s if s < 2 * 86400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86400),
    }
}
