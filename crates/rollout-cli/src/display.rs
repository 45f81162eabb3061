//! Display formatting for CLI output
//!
//! Provides:
//! - `ConsoleObserver`: phase lines and a readiness spinner during deploy
//! - Status snapshot tables
//! - Prerequisite and probe result lines

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rollout_core::{CheckOutcome, Requirement, UiEnvironment};
use rollout_kube::wait::summarize;
use rollout_kube::{
    Phase, ProbeResult, ProbeVerdict, ReadinessPoll, RolloutObserver, Section, Snapshot,
};
use std::time::Duration;

/// Prints pipeline progress to the terminal
#[derive(Default)]
pub struct ConsoleObserver {
    spinner: Option<ProgressBar>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn clear_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

impl RolloutObserver for ConsoleObserver {
    fn phase_started(&mut self, phase: Phase) {
        if phase == Phase::Readiness {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
            {
                pb.set_style(style);
            }
            pb.set_message(format!("{}...", phase));
            pb.enable_steady_tick(Duration::from_millis(120));
            self.spinner = Some(pb);
        } else {
            println!("{} {}...", style("→").blue().bold(), phase);
        }
    }

    fn phase_finished(&mut self, phase: Phase, summary: &str) {
        self.clear_spinner();
        println!("{} {}: {}", style("✓").green().bold(), phase, summary);
    }

    fn warning(&mut self, message: &str) {
        self.clear_spinner();
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    fn readiness_poll(&mut self, poll: &ReadinessPoll<'_>) {
        if let Some(pb) = &self.spinner {
            let detail = match poll.error {
                Some(error) => format!("poll failed: {}", error),
                None => summarize(poll.pods),
            };
            pb.set_message(format!(
                "Waiting for readiness [{}s, poll {}] {}",
                poll.elapsed.as_secs(),
                poll.attempt,
                detail
            ));
        }
    }
}

/// Print a namespace snapshot as three sections
pub fn print_snapshot(snapshot: &Snapshot) {
    println!();
    println!(
        "{} {}",
        style("Namespace:").bold(),
        style(&snapshot.namespace).yellow()
    );

    println!("\n{}", style("Pods").bold().underlined());
    match &snapshot.pods {
        Section::Rows(rows) if rows.is_empty() => println!("  (none)"),
        Section::Rows(rows) => {
            println!(
                "  {:<40} {:<7} {:<10} {:<9} {}",
                "NAME", "READY", "STATUS", "RESTARTS", "AGE"
            );
            for pod in rows {
                let phase = if pod.phase == "Running" || pod.phase == "Succeeded" {
                    style(&pod.phase).green()
                } else {
                    style(&pod.phase).yellow()
                };
                println!(
                    "  {:<40} {:<7} {:<10} {:<9} {}",
                    pod.name,
                    pod.ready,
                    phase,
                    pod.restarts,
                    pod.age.as_deref().unwrap_or("-")
                );
            }
        }
        Section::Unavailable(err) => print_unavailable(err),
    }

    println!("\n{}", style("Services").bold().underlined());
    match &snapshot.services {
        Section::Rows(rows) if rows.is_empty() => println!("  (none)"),
        Section::Rows(rows) => {
            println!("  {:<40} {:<12} {:<16} {}", "NAME", "TYPE", "CLUSTER-IP", "PORTS");
            for svc in rows {
                println!(
                    "  {:<40} {:<12} {:<16} {}",
                    svc.name, svc.type_, svc.cluster_ip, svc.ports
                );
            }
        }
        Section::Unavailable(err) => print_unavailable(err),
    }

    println!("\n{}", style("External endpoints").bold().underlined());
    match &snapshot.endpoints {
        Section::Rows(rows) if rows.is_empty() => println!("  (none)"),
        Section::Rows(rows) => {
            for ep in rows {
                println!("  {:<8} {:<32} {}", ep.kind, ep.name, style(&ep.url).cyan());
            }
        }
        Section::Unavailable(err) => print_unavailable(err),
    }
    println!();
}

fn print_unavailable(err: &str) {
    println!("  {} could not be read: {}", style("✗").red(), err);
}

/// Print one prerequisite outcome
pub fn print_check(outcome: &CheckOutcome) {
    let marker = match (outcome.passed, outcome.check.requirement) {
        (true, _) => style("✓").green().bold(),
        (false, Requirement::Optional) => style("⚠").yellow(),
        (false, Requirement::Mandatory) => style("✗").red().bold(),
    };
    match &outcome.detail {
        Some(detail) => println!("{} {} ({})", marker, outcome.check.name, style(detail).dim()),
        None => println!("{} {}", marker, outcome.check.name),
    }
    if !outcome.passed {
        println!("    {}", outcome.check.remediation);
    }
}

/// Print the UI environment contract with the key redacted
pub fn print_ui_environment(env: &UiEnvironment) {
    println!("\n{}", style("Chat UI environment").bold());
    for (key, value) in env.redacted_pairs() {
        println!("  {:<24} {}", key, value);
    }
}

/// Print an endpoint probe result
pub fn print_probe(result: &ProbeResult) {
    let marker = match result.verdict {
        ProbeVerdict::Reachable => style("✓").green().bold(),
        ProbeVerdict::RateLimited | ProbeVerdict::BlockedByPolicy => style("⚠").yellow(),
        _ => style("✗").red().bold(),
    };
    let status = result
        .status
        .map(|s| format!("HTTP {}", s))
        .unwrap_or_else(|| "no response".to_string());
    println!(
        "{} {} {} in {}ms: {}",
        marker,
        style(&result.url).cyan(),
        status,
        result.latency_ms,
        result.verdict.describe()
    );
    if !result.models.is_empty() {
        println!("  models: {}", result.models.join(", "));
    }
}
