//! Rollout Core - domain types for the rollout orchestrator
//!
//! This crate provides the synchronous building blocks used by the cluster
//! layer and the CLI:
//! - `Values`: release parameters with deep merge support
//! - `ReleaseSpec` / `ReleaseHandle`: the intent and the result of an apply
//! - `PrerequisiteSet`: ordered capability probes with remediation hints
//! - `Confirmation`: typed tokens gating destructive actions
//! - `UiEnvironment`: the environment contract of the chat UI workload
//! - `RolloutConfig`: file-backed orchestrator configuration

pub mod config;
pub mod confirm;
pub mod env;
pub mod error;
pub mod names;
pub mod prereq;
pub mod release;
pub mod values;

pub use config::RolloutConfig;
pub use confirm::{Confirmation, ConfirmationSource, ScriptedConfirmations};
pub use env::UiEnvironment;
pub use error::{CoreError, Result};
pub use names::{DEFAULT_NAMESPACE, DEFAULT_RELEASE, NameKind, validate_name};
pub use prereq::{Check, CheckOutcome, FileRole, PrerequisiteSet, Probe, Requirement};
pub use release::{ApplyAction, ChartSource, ReleaseHandle, ReleaseSpec, ReleaseStatus};
pub use values::{Values, parse_set_values};
