//! Provider adapter for Microsoft Foundry Local.
//!
//! Bridges a host agent framework to a locally running Foundry Local
//! inference server over its OpenAI-compatible API: endpoint discovery,
//! alias-to-model resolution, chat completion with tool calling, lifecycle
//! hook events, and an advisory performance log.
//!
//! ```no_run
//! use foundry_local_provider::{
//!     ChatMessage, ChatRequest, CompletionOptions, FoundryLocalProvider, FoundrySettings,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let provider = FoundryLocalProvider::new(FoundrySettings::default(), None).await?;
//! let request = ChatRequest::new(vec![
//!     ChatMessage::system("You are a helpful assistant."),
//!     ChatMessage::user("Hello!"),
//! ]);
//! let response = provider.complete(&request, &CompletionOptions::default()).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod hooks;
pub mod message;
pub mod metrics;
pub mod model;
pub mod provider;
pub mod telemetry;

pub use catalog::ModelCatalog;
pub use config::FoundrySettings;
pub use discovery::HardwareCapabilities;
pub use error::ProviderError;
pub use hooks::{
    HookBus, ProviderEvent, EVENT_REQUEST_COMPLETE, EVENT_REQUEST_ERROR, EVENT_REQUEST_START,
};
pub use message::{
    ChatMessage, ChatRequest, ChatResponse, ContentBlock, Role, ToolCall, ToolSpec, Usage,
};
pub use metrics::{PerformanceLog, PerformanceRecord, PerformanceSummary};
pub use model::{ConfigField, FieldType, GenerationDefaults, ModelInfo, ProviderDefaults, ProviderInfo};
pub use provider::{CompletionOptions, FoundryLocalProvider};
pub use telemetry::init_tracing;
