//! Status command - show what runs in a namespace

use rollout_core::RolloutConfig;
use rollout_kube::{Rollout, ShellCluster};

use crate::display;
use crate::error::{CliError, Result};

/// Run the status command
pub async fn run(config: &RolloutConfig, namespace: Option<&str>, json: bool) -> Result<()> {
    let namespace = namespace.unwrap_or(&config.namespace);
    let rollout = Rollout::new(ShellCluster::new(&config.kube_bin, &config.helm_bin));
    let snapshot = rollout.status(namespace).await;

    if json {
        let out = serde_json::to_string_pretty(&snapshot).map_err(|e| CliError::Other {
            message: format!("failed to serialize status: {}", e),
            help: None,
        })?;
        println!("{}", out);
    } else {
        display::print_snapshot(&snapshot);
    }
    Ok(())
}
