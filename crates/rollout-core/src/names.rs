//! Namespace and release name validation

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CoreError, Result};

/// Namespace used when the operator does not name one
pub const DEFAULT_NAMESPACE: &str = "f5-ai-security";

/// Release name used when the operator does not name one
pub const DEFAULT_RELEASE: &str = "f5-ai-security";

static DNS_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

/// What a name identifies; each kind has its own length limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Namespace,
    Release,
}

impl NameKind {
    fn max_len(self) -> usize {
        match self {
            // RFC 1123 label
            NameKind::Namespace => 63,
            // Helm reserves room for generated suffixes
            NameKind::Release => 53,
        }
    }
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameKind::Namespace => write!(f, "namespace"),
            NameKind::Release => write!(f, "release"),
        }
    }
}

/// Validate a namespace or release name
pub fn validate_name(kind: NameKind, name: &str) -> Result<()> {
    let invalid = |reason: String| CoreError::InvalidName {
        kind: kind.to_string(),
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty".to_string()));
    }
    if name.len() > kind.max_len() {
        return Err(invalid(format!(
            "must be at most {} characters (got {})",
            kind.max_len(),
            name.len()
        )));
    }
    if !DNS_LABEL.is_match(name) {
        return Err(invalid(
            "must consist of lowercase alphanumerics or '-', and start and end with an alphanumeric"
                .to_string(),
        ));
    }
    Ok(())
}
