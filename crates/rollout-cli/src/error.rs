//! CLI error types with exit code handling
//!
//! Every library error is mapped to one variant here; the variant decides
//! the process exit code and the remediation hint shown under the message.

use miette::Diagnostic;
use rollout_core::CoreError;
use rollout_kube::RolloutError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// A mandatory prerequisite is missing
    #[error("Prerequisite missing: {message}")]
    #[diagnostic(code(rollout::cli::prerequisite))]
    Prerequisite {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Namespace provisioning or release apply failed
    #[error("Deploy failed: {message}")]
    #[diagnostic(code(rollout::cli::apply))]
    Apply {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Teardown failed
    #[error("Teardown failed: {message}")]
    #[diagnostic(code(rollout::cli::removal))]
    Removal {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(rollout::cli::io))]
    Io {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid arguments, names or configuration
    #[error("Invalid input: {message}")]
    #[diagnostic(code(rollout::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Anything else
    #[error("{message}")]
    #[diagnostic(code(rollout::cli::error))]
    Other {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Prerequisite { .. } => exit_codes::PREREQUISITE_ERROR,
            CliError::Apply { .. } => exit_codes::APPLY_ERROR,
            CliError::Removal { .. } => exit_codes::REMOVAL_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a general error with help text
    pub fn other_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
            help: Some("Check that the path exists and is readable".to_string()),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::from(RolloutError::Core(err))
    }
}

impl From<RolloutError> for CliError {
    fn from(err: RolloutError) -> Self {
        let help = err.remediation();
        let message = match &err {
            RolloutError::Core(CoreError::Io(io)) | RolloutError::Io(io) => io.to_string(),
            other => other.to_string(),
        };
        match err {
            RolloutError::PrerequisiteMissing { .. } => CliError::Prerequisite { message, help },
            RolloutError::NamespaceFailed { .. }
            | RolloutError::ApplyFailed { .. }
            | RolloutError::ApplyTimeout { .. } => CliError::Apply { message, help },
            RolloutError::RemovalFailed { .. } => CliError::Removal { message, help },
            RolloutError::Core(CoreError::Io(_)) | RolloutError::Io(_) => {
                CliError::Io { message, help }
            }
            RolloutError::Core(_) => CliError::Usage { message, help },
            RolloutError::Probe(_) => CliError::Usage { message, help },
            _ => CliError::Other { message, help },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
