//! Deploy command - check, provision, apply, wait and report

use console::style;
use rollout_core::{RolloutConfig, UiEnvironment, parse_set_values};
use rollout_kube::{DeployRequest, Rollout, ShellCluster};
use std::path::PathBuf;
use std::time::Duration;

use crate::display::{self, ConsoleObserver};
use crate::error::Result;

/// Flags of `rollout deploy` that override the configuration
#[derive(Debug, Default)]
pub struct DeployOptions {
    pub namespace: Option<String>,
    pub release: Option<String>,
    pub chart: Option<String>,
    pub values: Option<PathBuf>,
    pub set: Vec<String>,
    pub timeout: Option<Duration>,
    pub wait_timeout: Option<Duration>,
    pub selector: Option<String>,
    pub probe: bool,
    pub probe_url: Option<String>,
}

/// Run the deploy command
pub async fn run(config: &RolloutConfig, options: DeployOptions) -> Result<()> {
    let mut config = config.clone();
    if let Some(release) = options.release {
        config.release = release;
    }
    if let Some(chart) = options.chart {
        config.chart = chart;
    }
    if let Some(values) = options.values {
        config.values_file = values;
    }
    if let Some(timeout) = options.timeout {
        config.apply_timeout = timeout;
    }
    if let Some(timeout) = options.wait_timeout {
        config.readiness_timeout = timeout;
    }
    if options.selector.is_some() {
        config.selector = options.selector;
    }

    let mut request = DeployRequest::from_config(&config, options.namespace.as_deref());
    let mut overrides = UiEnvironment::overrides_from(|key| std::env::var(key).ok());
    overrides.merge(&parse_set_values(&options.set)?);
    request.overrides = overrides;

    println!(
        "{} Deploying {} to namespace {}",
        style("→").blue().bold(),
        style(&request.release).cyan(),
        style(&request.namespace).yellow()
    );

    let cluster = ShellCluster::new(&config.kube_bin, &config.helm_bin);
    let mut rollout = Rollout::new(cluster).with_observer(ConsoleObserver::new());
    let outcome = rollout.deploy(&request).await?;

    display::print_snapshot(&outcome.snapshot);

    let verb = outcome.release.action;
    if outcome.is_ready() {
        println!(
            "{} Release {} {} (revision {}) and ready",
            style("✓").green().bold(),
            style(&outcome.release.name).cyan(),
            verb,
            style(outcome.release.revision).yellow()
        );
    } else {
        println!(
            "{} Release {} {} (revision {}) but not every pod is ready yet",
            style("⚠").yellow(),
            style(&outcome.release.name).cyan(),
            verb,
            style(outcome.release.revision).yellow()
        );
        if let Some(hint) = outcome.readiness.as_ref().err().and_then(|e| e.remediation()) {
            println!("  {}", hint);
        }
    }

    if options.probe || options.probe_url.is_some() {
        match probe_target(options.probe_url.as_deref(), |key| std::env::var(key).ok()) {
            Some(url) => {
                let api_key = UiEnvironment::from_env().api_key;
                super::probe::probe_once(&url, Some(api_key)).await?;
            }
            None => println!(
                "{} No chat API URL to probe; pass --probe-url or set DEFAULT_CHAT_ENDPOINT",
                style("⚠").yellow()
            ),
        }
    }

    Ok(())
}

/// The chat API base URL to probe after a deploy
///
/// The routes in the snapshot expose the UI, not the API, and the built-in
/// chat endpoint is cluster-internal; only an explicit URL is probed.
fn probe_target<F>(explicit: Option<&str>, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .map(str::to_string)
        .or_else(|| lookup("DEFAULT_CHAT_ENDPOINT"))
        .filter(|url| !url.is_empty())
}
