//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Values merge error: {message}")]
    ValuesMerge { message: String },

    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: String,
        name: String,
        reason: String,
    },

    #[error("Invalid configuration in {path}: {message}")]
    InvalidConfig { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
