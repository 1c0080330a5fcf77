//! Built-in defaults for the Foundry Local provider.

/// Default model, using the full hardware-variant identifier Foundry Local serves.
pub const DEFAULT_MODEL: &str = "qwen2.5-7b-instruct-generic-gpu:4";

/// Friendly alias used when probing the management endpoint at startup.
pub const DEFAULT_MODEL_ALIAS: &str = "qwen2.5-7b";

pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Per-request network timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

/// Maximum length of request/response bodies echoed to the debug log.
pub const DEFAULT_DEBUG_TRUNCATE_LENGTH: usize = 500;

/// Endpoint used when neither configuration nor CLI discovery yields one.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:65320/v1";

/// Foundry Local ignores credentials, but the OpenAI client requires a key.
pub const PLACEHOLDER_API_KEY: &str = "foundry-local-key";

/// Provider priority when none is configured. Local inference is preferred
/// over cloud providers.
pub const DEFAULT_PRIORITY: u32 = 100;
