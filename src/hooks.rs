//! Request lifecycle events for the host's hook bus.
//!
//! The provider emits an event when a request starts, completes, or fails.
//! Emission is strictly best-effort: a failing bus is logged at debug level
//! and never affects the completion result.

use crate::discovery::HardwareCapabilities;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Seam to the host coordinator's event system.
#[async_trait]
pub trait HookBus: Send + Sync {
    async fn emit(&self, event: &str, payload: Value) -> anyhow::Result<()>;
}

pub const EVENT_REQUEST_START: &str = "provider:request_start";
pub const EVENT_REQUEST_COMPLETE: &str = "provider:request_complete";
pub const EVENT_REQUEST_ERROR: &str = "provider:error";

/// A lifecycle notification with its payload fields.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProviderEvent {
    RequestStart {
        provider: &'static str,
        request_id: String,
        model: String,
        message_count: usize,
        has_tools: bool,
        tool_count: usize,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timestamp: f64,
        hardware_capabilities: Option<HardwareCapabilities>,
    },
    RequestComplete {
        provider: &'static str,
        request_id: String,
        model: String,
        elapsed_ms: u64,
        tokens_used: u32,
        input_tokens: u32,
        output_tokens: u32,
        finish_reason: Option<String>,
        has_tool_calls: bool,
        tool_call_count: usize,
        timestamp: f64,
    },
    RequestError {
        provider: &'static str,
        request_id: String,
        model: String,
        error: String,
        error_kind: &'static str,
        elapsed_ms: u64,
        timestamp: f64,
        recoverable: bool,
    },
}

impl ProviderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderEvent::RequestStart { .. } => EVENT_REQUEST_START,
            ProviderEvent::RequestComplete { .. } => EVENT_REQUEST_COMPLETE,
            ProviderEvent::RequestError { .. } => EVENT_REQUEST_ERROR,
        }
    }

    pub fn payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Seconds since the Unix epoch, fractional.
pub(crate) fn now_ts() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
