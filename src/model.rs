//! Model and provider descriptors.
//!
//! The alias table maps user-facing short names to the hardware-variant
//! identifiers Foundry Local serves, mirroring `foundry model list` output.
//! GPU variants are preferred where both exist.

use serde::{Deserialize, Serialize};

/// Alias to full model identifier.
pub const ALIAS_TO_MODEL_ID: &[(&str, &str)] = &[
    // Qwen models
    ("qwen2.5-7b", "qwen2.5-7b-instruct-generic-gpu:4"),
    ("qwen2.5-0.5b", "qwen2.5-0.5b-instruct-generic-gpu:4"),
    ("qwen2.5-1.5b", "qwen2.5-1.5b-instruct-generic-gpu:4"),
    ("qwen2.5-14b", "qwen2.5-14b-instruct-generic-gpu:4"),
    ("qwen2.5-coder-0.5b", "qwen2.5-coder-0.5b-instruct-generic-gpu:4"),
    ("qwen2.5-coder-1.5b", "qwen2.5-coder-1.5b-instruct-generic-gpu:4"),
    ("qwen2.5-coder-7b", "qwen2.5-coder-7b-instruct-generic-gpu:4"),
    ("qwen2.5-coder-14b", "qwen2.5-coder-14b-instruct-generic-gpu:4"),
    // Phi models
    ("phi-4", "phi-4-generic-gpu:1"),
    ("phi-4-mini", "phi-4-mini-instruct-generic-gpu:5"),
    ("phi-4-mini-reasoning", "phi-4-mini-reasoning-generic-gpu:3"),
    ("phi-3.5-mini", "phi-3.5-mini-instruct-generic-gpu:1"),
    ("phi-3-mini-128k", "phi-3-mini-128k-instruct-generic-gpu:1"),
    ("phi-3-mini-4k", "phi-3-mini-4k-instruct-generic-gpu:1"),
    // Other models
    ("mistral-7b-v0.2", "mistralai-Mistral-7B-Instruct-v0-2-generic-gpu:1"),
    ("deepseek-r1-14b", "deepseek-r1-distill-qwen-14b-generic-gpu:3"),
    ("deepseek-r1-7b", "deepseek-r1-distill-qwen-7b-generic-gpu:3"),
    ("gpt-oss-20b", "gpt-oss-20b-generic-cpu:1"), // CPU-only
];

/// Aliases checked during dynamic model discovery.
pub const WELL_KNOWN_ALIASES: &[&str] = &[
    "qwen2.5-7b",
    "qwen2.5-0.5b",
    "phi-4-mini",
    "qwen2.5-14b",
    "phi-3.5-mini",
    "phi-3-mini-128k",
    "phi-3-mini-4k",
    "mistral-7b-v0.2",
    "deepseek-r1-14b",
    "deepseek-r1-7b",
    "qwen2.5-coder-0.5b",
    "qwen2.5-coder-1.5b",
    "qwen2.5-coder-7b",
    "qwen2.5-coder-14b",
    "phi-4-mini-reasoning",
    "gpt-oss-20b",
];

/// Look up an alias in the static table.
pub fn resolve_alias(alias: &str) -> Option<&'static str> {
    ALIAS_TO_MODEL_ID
        .iter()
        .find(|(a, _)| *a == alias)
        .map(|(_, id)| *id)
}

/// Small models get a "fast" capability tag.
pub fn is_fast_alias(alias: &str) -> bool {
    ["0.5b", "1.5b", "mini"].iter().any(|s| alias.contains(s))
}

/// Output budget by model size class.
pub fn default_output_tokens(alias: &str) -> u32 {
    if alias.contains("7b") || alias.contains("14b") {
        2048
    } else {
        1024
    }
}

/// Generation parameters a model defaults to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationDefaults {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Descriptor for a single model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Alias (so the server can pick the hardware variant) or full identifier.
    pub id: String,
    pub display_name: String,
    pub context_window: u32,
    pub max_output_tokens: u32,
    pub capabilities: Vec<String>,
    pub defaults: GenerationDefaults,
}

/// Capability tags common to every Foundry Local model.
pub fn base_capabilities() -> Vec<String> {
    ["tools", "streaming", "offline", "hardware_optimized"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Well-known models reported when the management endpoint is unreachable.
pub fn static_models() -> Vec<ModelInfo> {
    let defaults = GenerationDefaults {
        max_tokens: 1024,
        temperature: 0.7,
    };
    let fast = |mut caps: Vec<String>| {
        caps.push("fast".to_string());
        caps
    };

    vec![
        ModelInfo {
            id: "qwen2.5-7b".to_string(),
            display_name: "Qwen 2.5 (7B)".to_string(),
            context_window: 32768,
            max_output_tokens: 2048,
            capabilities: base_capabilities(),
            defaults,
        },
        ModelInfo {
            id: "qwen2.5-0.5b".to_string(),
            display_name: "Qwen 2.5 (0.5B)".to_string(),
            context_window: 32768,
            max_output_tokens: 1024,
            capabilities: fast(base_capabilities()),
            defaults,
        },
        ModelInfo {
            id: "phi-4-mini".to_string(),
            display_name: "Phi-4 Mini".to_string(),
            context_window: 4096,
            max_output_tokens: 1024,
            capabilities: fast(base_capabilities()),
            defaults,
        },
    ]
}

/// Type of a user-configurable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Choice,
    Boolean,
}

/// A field the host may surface in its provider configuration UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigField {
    pub id: String,
    pub display_name: String,
    pub field_type: FieldType,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    pub default: serde_json::Value,
}

/// Default generation parameters advertised by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDefaults {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: f64,
    pub offline_only: bool,
}

/// Static provider metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub display_name: String,
    /// Always empty: a local server needs no credentials.
    pub credential_env_vars: Vec<String>,
    pub capabilities: Vec<String>,
    pub defaults: ProviderDefaults,
    pub config_fields: Vec<ConfigField>,
}
