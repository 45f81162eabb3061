//! CLI commands

pub mod check;
pub mod deploy;
pub mod probe;
pub mod status;
pub mod undeploy;
