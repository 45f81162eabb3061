//! Endpoint probe
//!
//! Issues `GET {base}/models` against an OpenAI-compatible endpoint and
//! classifies the answer. Behind the edge security layer a 403 usually
//! means the request fell through to the default-deny policy, which is
//! reported separately from an authentication failure.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::error::{Result, RolloutError};

/// Default request timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// What the endpoint answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "kebab-case")]
pub enum ProbeVerdict {
    /// 200
    Reachable,
    /// 401
    AuthRejected,
    /// 403
    BlockedByPolicy,
    /// 404
    NotFound,
    /// 429
    RateLimited,
    /// Any other status
    Unexpected(u16),
    /// No HTTP response at all
    Unreachable(String),
}

impl ProbeVerdict {
    pub fn from_status(status: u16) -> Self {
        match status {
            200 => Self::Reachable,
            401 => Self::AuthRejected,
            403 => Self::BlockedByPolicy,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            other => Self::Unexpected(other),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Reachable)
    }

    /// One-line explanation for the operator
    pub fn describe(&self) -> String {
        match self {
            Self::Reachable => "endpoint reachable".to_string(),
            Self::AuthRejected => "authentication rejected, check the API key".to_string(),
            Self::BlockedByPolicy => {
                "request blocked, likely by an edge security policy".to_string()
            }
            Self::NotFound => "models route not found, check the base URL".to_string(),
            Self::RateLimited => "rate limited, retry later".to_string(),
            Self::Unexpected(code) => format!("unexpected HTTP status {}", code),
            Self::Unreachable(reason) => format!("unreachable: {}", reason),
        }
    }
}

/// Result of one probe
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub url: String,
    #[serde(flatten)]
    pub verdict: ProbeVerdict,
    pub status: Option<u16>,
    pub latency_ms: u64,
    /// Model ids listed by a reachable endpoint
    pub models: Vec<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

/// HTTP prober for OpenAI-compatible endpoints
#[derive(Debug, Clone)]
pub struct EndpointProbe {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl EndpointProbe {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_PROBE_TIMEOUT)
    }

    pub fn with_timeout(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RolloutError::Probe(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Probe `{base_url}/models`
    ///
    /// Only a malformed URL is an error; every HTTP outcome, including
    /// transport failure, is a verdict.
    pub async fn probe(&self, base_url: &str) -> Result<ProbeResult> {
        let url = models_url(base_url)?;
        let start = Instant::now();

        let mut request = self.client.get(url.clone());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let result = match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let verdict = ProbeVerdict::from_status(status);
                let models = if verdict.is_success() {
                    response
                        .json::<ModelList>()
                        .await
                        .map(|list| list.data.into_iter().map(|m| m.id).collect())
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                ProbeResult {
                    url: url.to_string(),
                    verdict,
                    status: Some(status),
                    latency_ms: start.elapsed().as_millis() as u64,
                    models,
                }
            }
            Err(e) => ProbeResult {
                url: url.to_string(),
                verdict: ProbeVerdict::Unreachable(e.to_string()),
                status: None,
                latency_ms: start.elapsed().as_millis() as u64,
                models: Vec::new(),
            },
        };

        tracing::debug!(url = %result.url, status = ?result.status, "probe finished");
        Ok(result)
    }
}

fn models_url(base_url: &str) -> Result<url::Url> {
    let base = url::Url::parse(base_url.trim())
        .map_err(|e| RolloutError::Probe(format!("invalid URL '{}': {}", base_url, e)))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(RolloutError::Probe(format!(
            "unsupported scheme '{}' in '{}'",
            base.scheme(),
            base_url
        )));
    }
    let joined = format!("{}/models", base.as_str().trim_end_matches('/'));
    url::Url::parse(&joined)
        .map_err(|e| RolloutError::Probe(format!("invalid URL '{}': {}", joined, e)))
}
