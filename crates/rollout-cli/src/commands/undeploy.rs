//! Undeploy command - confirmation-gated teardown

use console::style;
use rollout_core::{ConfirmationSource, RolloutConfig};
use rollout_kube::{RemovalOutcome, Rollout, ShellCluster, UndeployRequest};

use crate::display::ConsoleObserver;
use crate::error::Result;

/// Run the undeploy command
pub async fn run<C: ConfirmationSource>(
    config: &RolloutConfig,
    namespace: Option<&str>,
    release: Option<String>,
    keep_namespace: bool,
    confirmations: &mut C,
) -> Result<()> {
    let mut request = UndeployRequest::from_config(config, namespace);
    if let Some(release) = release {
        request.release = release;
    }
    request.purge_namespace = !keep_namespace;

    println!(
        "{} Tearing down {} in namespace {}",
        style("→").blue().bold(),
        style(&request.release).cyan(),
        style(&request.namespace).yellow()
    );

    let cluster = ShellCluster::new(&config.kube_bin, &config.helm_bin);
    let mut rollout = Rollout::new(cluster).with_observer(ConsoleObserver::new());
    let outcome = rollout.undeploy(&request, confirmations).await?;

    if outcome.release == RemovalOutcome::Declined {
        println!(
            "{} Teardown cancelled, nothing was removed",
            style("✓").green().bold()
        );
        return Ok(());
    }

    println!(
        "{} Release {}: {}",
        style("✓").green().bold(),
        style(&request.release).cyan(),
        outcome.release
    );
    match outcome.namespace {
        Some(RemovalOutcome::Declined) | None => println!(
            "  Namespace {} kept",
            style(&request.namespace).yellow()
        ),
        Some(ns) => println!(
            "{} Namespace {}: {}",
            style("✓").green().bold(),
            style(&request.namespace).yellow(),
            ns
        ),
    }

    Ok(())
}
