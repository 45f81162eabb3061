//! Integration tests for CLI commands
//!
//! None of these reach a cluster: the kube and helm binaries point at paths
//! that do not exist, so only the local paths of each command run.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

const MISSING_OC: &str = "/nonexistent/rollout-test/oc";
const MISSING_HELM: &str = "/nonexistent/rollout-test/helm";

/// Workspace with an empty config file, isolated from the caller's environment
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("config.yaml"), "").expect("write config");
        Self { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.yaml")
    }

    fn rollout(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_rollout"))
            .arg("--config")
            .arg(self.config())
            .args(["--kube-bin", MISSING_OC, "--helm-bin", MISSING_HELM])
            .args(args)
            .current_dir(self.dir.path())
            .env_remove("ROLLOUT_CONFIG")
            .env_remove("ROLLOUT_KUBE_BIN")
            .env_remove("ROLLOUT_HELM_BIN")
            .env_remove("DEFAULT_API_KEY")
            .env("NO_COLOR", "1")
            .output()
            .expect("Failed to execute rollout")
    }
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

mod general {
    use super::*;

    #[test]
    fn test_help() {
        let output = Command::new(env!("CARGO_BIN_EXE_rollout"))
            .arg("--help")
            .output()
            .expect("Failed to execute rollout");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        for cmd in ["deploy", "undeploy", "status", "check", "probe"] {
            assert!(stdout.contains(cmd), "help should list {cmd}");
        }
    }

    #[test]
    fn test_unknown_subcommand_is_usage_error() {
        let output = Sandbox::new().rollout(&["launch"]);
        assert_eq!(output.status.code(), Some(64));
    }

    #[test]
    fn test_missing_config_file() {
        let output = Command::new(env!("CARGO_BIN_EXE_rollout"))
            .args(["--config", "/nonexistent/rollout-test/config.yaml", "check"])
            .output()
            .expect("Failed to execute rollout");

        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn test_invalid_config_is_usage_error() {
        let sandbox = Sandbox::new();
        std::fs::write(sandbox.config(), "pollInterval: 0s\n").unwrap();

        let output = sandbox.rollout(&["status"]);
        assert_eq!(output.status.code(), Some(64));
        assert!(stderr(&output).contains("pollInterval"));
    }
}

mod check_command {
    use super::*;

    #[test]
    fn test_missing_tools_fail_with_prerequisite_code() {
        let output = Sandbox::new().rollout(&["check"]);

        assert_eq!(output.status.code(), Some(2));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("✗"));
    }
}

mod deploy_command {
    use super::*;

    #[test]
    fn test_missing_tools_stop_before_anything_runs() {
        let output = Sandbox::new().rollout(&["deploy", "team-a"]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("Prerequisite missing"));
    }

    #[test]
    fn test_invalid_namespace_is_usage_error() {
        let output = Sandbox::new().rollout(&["deploy", "Bad_Name"]);

        assert_eq!(output.status.code(), Some(64));
        assert!(stderr(&output).contains("Bad_Name"));
    }

    #[test]
    fn test_bad_set_value_is_usage_error() {
        let output = Sandbox::new().rollout(&["deploy", "team-a", "--set", "no-equals-sign"]);
        assert_eq!(output.status.code(), Some(64));
    }

    #[test]
    fn test_bad_timeout_is_rejected_by_parser() {
        let output = Sandbox::new().rollout(&["deploy", "team-a", "--timeout", "soon"]);
        assert_eq!(output.status.code(), Some(64));
    }
}

mod status_command {
    use super::*;

    #[test]
    fn test_status_json_marks_sections_unavailable() {
        let output = Sandbox::new().rollout(&["status", "team-a", "--json"]);

        assert!(output.status.success(), "status never fails: {}", stderr(&output));
        let stdout = String::from_utf8_lossy(&output.stdout);
        let json: serde_json::Value =
            serde_json::from_str(&stdout).expect("Output should be valid JSON");

        assert_eq!(json["namespace"], "team-a");
        assert!(json["pods"].get("unavailable").is_some());
        assert!(json["services"].get("unavailable").is_some());
    }
}

mod probe_command {
    use super::*;

    #[test]
    fn test_invalid_url_is_usage_error() {
        let output = Sandbox::new().rollout(&["probe", "not-a-url"]);
        assert_eq!(output.status.code(), Some(64));
    }
}

mod undeploy_command {
    use super::*;

    #[test]
    fn test_missing_tools_fail_before_prompting() {
        let output = Sandbox::new().rollout(&["undeploy", "team-a"]);

        assert_eq!(output.status.code(), Some(2));
        assert!(!stderr(&output).contains("Type 'yes'"));
    }
}
