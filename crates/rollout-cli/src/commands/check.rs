//! Check command - run every prerequisite and report each outcome

use console::style;
use rollout_core::{PrerequisiteSet, RolloutConfig, UiEnvironment};
use rollout_kube::{ShellCluster, evaluate};

use crate::display;
use crate::error::{CliError, Result};

/// Run the check command
pub async fn run(config: &RolloutConfig) -> Result<()> {
    let cluster = ShellCluster::new(&config.kube_bin, &config.helm_bin);
    let set = PrerequisiteSet::standard(
        &config.kube_bin,
        &config.helm_bin,
        Some(config.values_file.clone()),
        config.api_spec.clone(),
    );

    println!("{} Checking prerequisites", style("→").blue().bold());
    let outcomes = evaluate(&cluster, &set).await?;
    for outcome in &outcomes {
        display::print_check(outcome);
    }
    display::print_ui_environment(&UiEnvironment::from_env());

    let missing: Vec<&str> = outcomes
        .iter()
        .filter(|o| !o.passed && o.check.is_mandatory())
        .map(|o| o.check.name.as_str())
        .collect();
    if missing.is_empty() {
        println!("\n{} Ready to deploy", style("✓").green().bold());
        Ok(())
    } else {
        Err(CliError::Prerequisite {
            message: format!("{} not met", missing.join(", ")),
            help: Some("Fix the items marked ✗ above and run `rollout check` again".to_string()),
        })
    }
}
