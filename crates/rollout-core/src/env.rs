//! Environment contract of the chat UI workload
//!
//! The UI reads these variables once at startup. Rollout does not run the UI;
//! it only declares the contract and forwards operator overrides into the
//! release parameters under `frontend.env`.

use serde_json::Value as JsonValue;

use crate::values::Values;

pub const DEFAULT_CHAT_ENDPOINT: &str = "http://llamastack:8321/v1/openai/v1";
pub const DEFAULT_MODEL: &str = "remote-llm/RedHatAI/Llama-3.2-1B-Instruct-quantized.w8a8";
pub const DEFAULT_API_KEY: &str = "dummy-key";
pub const LLAMA_STACK_ENDPOINT: &str = "http://llamastack:8321";

/// Parameter prefix the chart reads UI environment from
pub const ENV_VALUES_PREFIX: &str = "frontend.env";

/// Variable names, in the order the UI documents them
pub const UI_ENV_VARS: [&str; 4] = [
    "DEFAULT_CHAT_ENDPOINT",
    "DEFAULT_MODEL",
    "DEFAULT_API_KEY",
    "LLAMA_STACK_ENDPOINT",
];

/// Resolved UI environment
#[derive(Clone, PartialEq, Eq)]
pub struct UiEnvironment {
    pub chat_endpoint: String,
    pub model: String,
    pub api_key: String,
    pub llama_stack_endpoint: String,
}

impl std::fmt::Debug for UiEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiEnvironment")
            .field("chat_endpoint", &self.chat_endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("llama_stack_endpoint", &self.llama_stack_endpoint)
            .finish()
    }
}

impl Default for UiEnvironment {
    fn default() -> Self {
        Self {
            chat_endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            llama_stack_endpoint: LLAMA_STACK_ENDPOINT.to_string(),
        }
    }
}

impl UiEnvironment {
    /// Read from the process environment, falling back to documented defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Read through an arbitrary lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            chat_endpoint: get("DEFAULT_CHAT_ENDPOINT", DEFAULT_CHAT_ENDPOINT),
            model: get("DEFAULT_MODEL", DEFAULT_MODEL),
            api_key: get("DEFAULT_API_KEY", DEFAULT_API_KEY),
            llama_stack_endpoint: get("LLAMA_STACK_ENDPOINT", LLAMA_STACK_ENDPOINT),
        }
    }

    /// Only the variables the operator explicitly set, as release parameters
    ///
    /// Unset variables are left to the chart so its own defaults apply.
    pub fn overrides_from<F>(lookup: F) -> Values
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = Values::new();
        for key in UI_ENV_VARS {
            if let Some(v) = lookup(key).filter(|v| !v.is_empty()) {
                // Keys are fixed identifiers, so `set` cannot see an empty segment
                let path = format!("{}.{}", ENV_VALUES_PREFIX, key);
                if values.set(&path, JsonValue::String(v)).is_err() {
                    tracing::warn!("skipping UI environment override {}", key);
                }
            }
        }
        values
    }

    /// Pairs in documented order, API key redacted
    pub fn redacted_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("DEFAULT_CHAT_ENDPOINT", self.chat_endpoint.clone()),
            ("DEFAULT_MODEL", self.model.clone()),
            ("DEFAULT_API_KEY", redact(&self.api_key)),
            ("LLAMA_STACK_ENDPOINT", self.llama_stack_endpoint.clone()),
        ]
    }
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "*".repeat(secret.chars().count().min(8))
    }
}
