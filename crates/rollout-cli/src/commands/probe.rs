//! Probe command - ask an endpoint what it thinks of us

use console::style;
use rollout_kube::EndpointProbe;

use crate::display;
use crate::error::{CliError, Result};

/// Run the probe command
pub async fn run(url: &str, api_key: Option<String>, json: bool) -> Result<()> {
    let probe = EndpointProbe::new(api_key)?;
    let result = probe.probe(url).await?;

    if json {
        let out = serde_json::to_string_pretty(&result).map_err(|e| CliError::Other {
            message: format!("failed to serialize probe result: {}", e),
            help: None,
        })?;
        println!("{}", out);
    } else {
        display::print_probe(&result);
    }

    if result.verdict.is_success() {
        Ok(())
    } else {
        Err(CliError::other_with_help(
            format!("endpoint {} did not answer successfully", result.url),
            result.verdict.describe(),
        ))
    }
}

/// Probe once after a deploy; a bad answer is reported, not fatal
pub async fn probe_once(url: &str, api_key: Option<String>) -> Result<()> {
    println!("{} Probing {}", style("→").blue().bold(), style(url).cyan());
    let result = EndpointProbe::new(api_key)?.probe(url).await?;
    display::print_probe(&result);
    Ok(())
}
