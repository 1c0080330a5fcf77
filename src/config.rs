//! Provider configuration.
//!
//! Settings arrive from the host as a JSON mapping and are fixed for the
//! provider's lifetime. Every key is optional; missing or unparseable values
//! fall back to the built-in constants.

use crate::constants::{
    DEFAULT_DEBUG_TRUNCATE_LENGTH, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_MODEL_ALIAS,
    DEFAULT_PRIORITY, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Foundry Local provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoundrySettings {
    /// Model used when a request names none. Alias or full identifier.
    pub default_model: String,

    /// Friendly alias used for the startup management probe.
    pub model_alias: String,

    /// Maximum output tokens when the request carries no limit.
    pub max_tokens: u32,

    /// Sampling temperature when the request carries none.
    pub temperature: f32,

    /// Per-request network timeout in seconds.
    pub timeout: f64,

    /// Echo (truncated) request/response bodies to the debug log.
    pub debug: bool,

    /// Truncation length for debug echoes.
    pub debug_truncate_length: usize,

    /// Probe local hardware at startup and report it in lifecycle events.
    pub auto_hardware_optimization: bool,

    /// Require offline operation; advertised in provider metadata.
    pub offline_mode: bool,

    /// Selection priority relative to other providers.
    pub priority: u32,

    /// Explicit endpoint override. Skips discovery entirely when set.
    pub base_url: Option<String>,
}

impl Default for FoundrySettings {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            model_alias: DEFAULT_MODEL_ALIAS.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT_SECS,
            debug: false,
            debug_truncate_length: DEFAULT_DEBUG_TRUNCATE_LENGTH,
            auto_hardware_optimization: true,
            offline_mode: true,
            priority: DEFAULT_PRIORITY,
            base_url: None,
        }
    }
}

impl FoundrySettings {
    /// Build settings from a host-supplied config mapping.
    ///
    /// Best-effort: a mapping that fails to deserialize is logged and
    /// replaced with the defaults rather than rejected.
    pub fn from_value(value: &serde_json::Value) -> Self {
        match serde_json::from_value(value.clone()) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "invalid provider config, using defaults");
                Self::default()
            }
        }
    }

    /// Set the endpoint override.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the default model.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout.max(0.0))
    }

    /// Truncate a body for debug logging.
    pub fn debug_excerpt(&self, body: &str) -> String {
        if body.len() <= self.debug_truncate_length {
            return body.to_string();
        }
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i < self.debug_truncate_length)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}... [truncated {} bytes]", &body[..cut], body.len() - cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_match_constants() {
        let settings = FoundrySettings::default();
        assert_eq!(settings.default_model, DEFAULT_MODEL);
        assert_eq!(settings.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(settings.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(settings.priority, 100);
        assert!(settings.offline_mode);
        assert!(settings.base_url.is_none());
    }

    #[test]
    fn test_empty_mapping_yields_builtin_model() {
        let settings = FoundrySettings::from_value(&json!({}));
        assert_eq!(settings.default_model, DEFAULT_MODEL);
    }

    #[test]
    fn test_partial_mapping_overrides() {
        let settings = FoundrySettings::from_value(&json!({
            "default_model": "phi-4-mini",
            "timeout": 5.0,
            "base_url": "http://127.0.0.1:8080/v1",
        }));
        assert_eq!(settings.default_model, "phi-4-mini");
        assert_eq!(settings.timeout, 5.0);
        assert_eq!(
            settings.base_url.as_deref(),
            Some("http://127.0.0.1:8080/v1")
        );
        // Untouched keys keep their defaults
        assert_eq!(settings.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let settings = FoundrySettings::from_value(&json!({
            "default_model": "qwen2.5-0.5b",
            "some_future_knob": 42,
        }));
        assert_eq!(settings.default_model, "qwen2.5-0.5b");
    }

    #[test]
    fn test_debug_excerpt_truncates() {
        let settings = FoundrySettings {
            debug_truncate_length: 10,
            ..Default::default()
        };
        let excerpt = settings.debug_excerpt("abcdefghijklmnop");
        assert!(excerpt.starts_with("abcdefghij"));
        assert!(excerpt.contains("truncated"));

        assert_eq!(settings.debug_excerpt("short"), "short");
    }
}
