//! Rollout CLI - deploy the F5 AI security demo stack to OpenShift or Kubernetes

use clap::{ArgAction, Parser, Subcommand};
use rollout_core::RolloutConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;
mod error;
mod exit_codes;
mod prompt;

use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "rollout")]
#[command(author = "F5 AI Security Contributors")]
#[command(version)]
#[command(about = "Deploy, inspect and tear down the F5 AI security demo stack", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ~/.config/rollout/config.yaml)
    #[arg(long, global = true, env = "ROLLOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Kubernetes CLI to use (oc or kubectl)
    #[arg(long, global = true, env = "ROLLOUT_KUBE_BIN")]
    kube_bin: Option<String>,

    /// Helm CLI to use
    #[arg(long, global = true, env = "ROLLOUT_HELM_BIN")]
    helm_bin: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check prerequisites, provision the namespace, apply the release and wait for it
    Deploy {
        /// Target namespace
        namespace: Option<String>,

        /// Release name
        #[arg(long)]
        release: Option<String>,

        /// Chart directory or reference
        #[arg(long)]
        chart: Option<String>,

        /// Values file passed to the release
        #[arg(short = 'f', long = "values")]
        values: Option<PathBuf>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Time allowed for the cluster to accept the release (e.g. 10m)
        #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
        timeout: Option<Duration>,

        /// Time allowed for pods to become ready (e.g. 300s)
        #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
        wait_timeout: Option<Duration>,

        /// Label selector used for readiness
        #[arg(long)]
        selector: Option<String>,

        /// Probe the chat API once deployed (`--probe-url`, else DEFAULT_CHAT_ENDPOINT)
        #[arg(long)]
        probe: bool,

        /// Chat API base URL to probe once deployed; implies --probe
        #[arg(long, value_name = "URL")]
        probe_url: Option<String>,
    },

    /// Remove the release and, after a second confirmation, its namespace
    Undeploy {
        /// Target namespace
        namespace: Option<String>,

        /// Release name
        #[arg(long)]
        release: Option<String>,

        /// Never offer to delete the namespace
        #[arg(long)]
        keep_namespace: bool,
    },

    /// Show pods, services and external endpoints of a namespace
    Status {
        /// Target namespace
        namespace: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every prerequisite check and print the results
    Check,

    /// Probe an OpenAI-compatible endpoint through the edge security layer
    Probe {
        /// Base URL, e.g. https://chat.example.com/v1
        url: String,

        /// Bearer key sent with the request
        #[arg(long, env = "DEFAULT_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(exit_codes::USAGE_ERROR);
        }
    };

    if cli.debug {
        // SAFETY: We're the only thread at this point (start of main)
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }
    init_tracing(cli.verbose, cli.debug);

    let code = match tokio::runtime::Runtime::new() {
        Ok(runtime) => match runtime.block_on(run(cli)) {
            Ok(()) => exit_codes::SUCCESS,
            Err(err) => report(err),
        },
        Err(e) => report(CliError::from(e)),
    };
    std::process::exit(code);
}

fn init_tracing(verbose: u8, debug: bool) {
    let filter = match (debug, verbose) {
        (true, _) | (_, 2..) => "debug",
        (_, 1) => "info",
        _ => "warn",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(fmt::layer().without_time().with_writer(std::io::stderr))
        .init();
}

fn report(err: CliError) -> i32 {
    let code = err.exit_code();
    eprintln!("{:?}", miette::Report::new(err));
    code
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = RolloutConfig::load(cli.config.as_deref())?;
    if let Some(kube_bin) = cli.kube_bin {
        config.kube_bin = kube_bin;
    }
    if let Some(helm_bin) = cli.helm_bin {
        config.helm_bin = helm_bin;
    }
    tracing::debug!(?config, "effective configuration");

    match cli.command {
        Commands::Deploy {
            namespace,
            release,
            chart,
            values,
            set,
            timeout,
            wait_timeout,
            selector,
            probe,
            probe_url,
        } => {
            commands::deploy::run(
                &config,
                commands::deploy::DeployOptions {
                    namespace,
                    release,
                    chart,
                    values,
                    set,
                    timeout,
                    wait_timeout,
                    selector,
                    probe,
                    probe_url,
                },
            )
            .await
        }

        Commands::Undeploy {
            namespace,
            release,
            keep_namespace,
        } => {
            commands::undeploy::run(
                &config,
                namespace.as_deref(),
                release,
                keep_namespace,
                &mut prompt::terminal(),
            )
            .await
        }

        Commands::Status { namespace, json } => {
            commands::status::run(&config, namespace.as_deref(), json).await
        }

        Commands::Check => commands::check::run(&config).await,

        Commands::Probe { url, api_key, json } => commands::probe::run(&url, api_key, json).await,
    }
}
