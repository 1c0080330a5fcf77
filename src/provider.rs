//! The Foundry Local provider adapter.
//!
//! Stateless between calls apart from the immutable settings and the
//! advisory performance log. Each `complete` performs exactly one network
//! round trip, bounded by the configured timeout.

use crate::catalog::ModelCatalog;
use crate::config::FoundrySettings;
use crate::constants::{
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
    PLACEHOLDER_API_KEY,
};
use crate::discovery::{self, HardwareCapabilities};
use crate::error::ProviderError;
use crate::hooks::{now_ts, HookBus, ProviderEvent};
use crate::message::{ChatRequest, ChatResponse, ContentBlock, ToolCall, Usage};
use crate::metrics::{PerformanceLog, PerformanceRecord, PerformanceSummary};
use crate::model::{ConfigField, FieldType, ModelInfo, ProviderDefaults, ProviderInfo};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionToolChoiceOption,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FinishReason,
    },
    Client,
};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Per-call overrides, applied on top of the request and the settings.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Model alias or identifier; falls back to the configured default.
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Tool-choice policy when tools are present. Defaults to auto.
    pub tool_choice: Option<ChatCompletionToolChoiceOption>,
    /// Whether the model may emit several tool calls at once. Defaults to true.
    pub parallel_tool_calls: Option<bool>,
}

/// Provider adapter for a locally running Foundry Local server.
pub struct FoundryLocalProvider {
    settings: FoundrySettings,
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    catalog: ModelCatalog,
    hardware: Option<HardwareCapabilities>,
    hooks: Option<Arc<dyn HookBus>>,
    metrics: PerformanceLog,
}

impl FoundryLocalProvider {
    pub const NAME: &'static str = "foundry-local";
    pub const API_LABEL: &'static str = "Foundry Local";

    /// Build a provider, discovering the endpoint and probing the server.
    pub async fn new(
        settings: FoundrySettings,
        hooks: Option<Arc<dyn HookBus>>,
    ) -> Result<Self, ProviderError> {
        let endpoint = discovery::discover_endpoint(&settings).await;

        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(PLACEHOLDER_API_KEY)
                .with_api_base(endpoint.clone()),
        );
        let http = Self::build_http_client()?;

        // Best-effort, off the construction path
        tokio::spawn(discovery::check_connectivity(http.clone(), endpoint));

        Self::assemble(settings, client, http, hooks).await
    }

    /// Build a provider around a pre-configured client, skipping endpoint
    /// discovery.
    pub async fn with_client(
        settings: FoundrySettings,
        client: Client<OpenAIConfig>,
        hooks: Option<Arc<dyn HookBus>>,
    ) -> Result<Self, ProviderError> {
        let http = Self::build_http_client()?;
        Self::assemble(settings, client, http, hooks).await
    }

    fn build_http_client() -> Result<reqwest::Client, ProviderError> {
        // Close idle connections promptly; the local server restarts often
        Ok(reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()?)
    }

    async fn assemble(
        settings: FoundrySettings,
        client: Client<OpenAIConfig>,
        http: reqwest::Client,
        hooks: Option<Arc<dyn HookBus>>,
    ) -> Result<Self, ProviderError> {
        let catalog = ModelCatalog::detect(&client).await;

        let hardware = if settings.auto_hardware_optimization {
            discovery::probe_hardware().await
        } else {
            None
        };

        info!(
            managed = catalog.is_managed(),
            default_model = %settings.default_model,
            model_alias = %settings.model_alias,
            hardware_optimization = settings.auto_hardware_optimization,
            offline_mode = settings.offline_mode,
            priority = settings.priority,
            "foundry local provider initialized"
        );

        Ok(Self {
            settings,
            client,
            http,
            catalog,
            hardware,
            hooks,
            metrics: PerformanceLog::default(),
        })
    }

    pub fn settings(&self) -> &FoundrySettings {
        &self.settings
    }

    pub fn hardware(&self) -> Option<&HardwareCapabilities> {
        self.hardware.as_ref()
    }

    /// Raw HTTP client used for out-of-band probes.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    /// Static provider metadata. Always succeeds.
    pub fn get_info(&self) -> ProviderInfo {
        ProviderInfo {
            id: Self::NAME.to_string(),
            display_name: "Microsoft Foundry Local".to_string(),
            credential_env_vars: Vec::new(),
            capabilities: ["streaming", "tools", "offline", "hardware_optimized"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            defaults: ProviderDefaults {
                model: DEFAULT_MODEL.to_string(),
                max_tokens: DEFAULT_MAX_TOKENS,
                temperature: DEFAULT_TEMPERATURE,
                timeout: DEFAULT_TIMEOUT_SECS,
                offline_only: true,
            },
            config_fields: vec![
                ConfigField {
                    id: "default_model".to_string(),
                    display_name: "Default Model".to_string(),
                    field_type: FieldType::Choice,
                    prompt: "Select default model".to_string(),
                    choices: vec![
                        "qwen2.5-7b-instruct-generic-gpu:4".to_string(),
                        "qwen2.5-0.5b-instruct-generic-gpu:4".to_string(),
                        "phi-4-mini-instruct-generic-gpu:5".to_string(),
                        "gpt-oss-20b-generic-cpu:1".to_string(),
                    ],
                    default: json!(DEFAULT_MODEL),
                },
                ConfigField {
                    id: "auto_hardware_optimization".to_string(),
                    display_name: "Hardware Optimization".to_string(),
                    field_type: FieldType::Boolean,
                    prompt: "Automatically optimize for CPU/GPU/NPU".to_string(),
                    choices: Vec::new(),
                    default: json!(true),
                },
                ConfigField {
                    id: "offline_mode".to_string(),
                    display_name: "Offline Only".to_string(),
                    field_type: FieldType::Boolean,
                    prompt: "Require offline operation (no cloud fallback)".to_string(),
                    choices: Vec::new(),
                    default: json!(true),
                },
            ],
        }
    }

    /// List available models. Absorbs discovery failures; never errors.
    pub async fn list_models(&self) -> Vec<ModelInfo> {
        self.catalog.list_models().await
    }

    /// Run one chat completion against the local server.
    pub async fn complete(
        &self,
        request: &ChatRequest,
        options: &CompletionOptions,
    ) -> Result<ChatResponse, ProviderError> {
        let request_id = format!("req_{}", Uuid::new_v4().simple());
        let alias = options
            .model
            .as_deref()
            .unwrap_or(&self.settings.default_model);
        let model = self.catalog.resolve_model(alias);

        info!(
            request_id = %request_id,
            model = %model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "chat completion requested"
        );

        let started = Instant::now();
        self.emit(ProviderEvent::RequestStart {
            provider: Self::NAME,
            request_id: request_id.clone(),
            model: model.clone(),
            message_count: request.messages.len(),
            has_tools: !request.tools.is_empty(),
            tool_count: request.tools.len(),
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            timestamp: now_ts(),
            hardware_capabilities: self.hardware.clone(),
        })
        .await;

        let wire = match self.build_request(&model, request, options) {
            Ok(wire) => wire,
            Err(err) => {
                self.fail(&request_id, &model, &err, started.elapsed()).await;
                return Err(err);
            }
        };

        if self.settings.debug {
            if let Ok(body) = serde_json::to_string(&wire) {
                debug!(
                    request_id = %request_id,
                    body = %self.settings.debug_excerpt(&body),
                    "request body"
                );
            }
        }

        let timeout = self.settings.timeout_duration();
        let response = match tokio::time::timeout(timeout, self.client.chat().create(wire)).await {
            Err(_) => {
                let err = ProviderError::Timeout {
                    seconds: self.settings.timeout,
                };
                self.fail(&request_id, &model, &err, started.elapsed()).await;
                return Err(err);
            }
            Ok(Err(e)) => {
                let err = ProviderError::Api(e);
                self.fail(&request_id, &model, &err, started.elapsed()).await;
                return Err(err);
            }
            Ok(Ok(response)) => response,
        };

        let elapsed = started.elapsed();
        let chat = match translate_response(response) {
            Ok(chat) => chat,
            Err(err) => {
                self.fail(&request_id, &model, &err, elapsed).await;
                return Err(err);
            }
        };

        let elapsed_ms = elapsed.as_millis() as u64;
        self.metrics.record(
            &request_id,
            PerformanceRecord::success(model.clone(), elapsed_ms, chat.usage.total_tokens),
        );

        if self.settings.debug {
            debug!(
                request_id = %request_id,
                tokens = chat.usage.total_tokens,
                elapsed_ms,
                "completion performance"
            );
        }
        info!(request_id = %request_id, elapsed_ms, "chat completion finished");

        self.emit(ProviderEvent::RequestComplete {
            provider: Self::NAME,
            request_id,
            model,
            elapsed_ms,
            tokens_used: chat.usage.total_tokens,
            input_tokens: chat.usage.input_tokens,
            output_tokens: chat.usage.output_tokens,
            finish_reason: chat.finish_reason.clone(),
            has_tool_calls: chat.tool_calls.is_some(),
            tool_call_count: chat.tool_calls.as_ref().map_or(0, |c| c.len()),
            timestamp: now_ts(),
        })
        .await;

        Ok(chat)
    }

    /// Tool calls the model asked for, or empty when it answered with text.
    pub fn parse_tool_calls(&self, response: &ChatResponse) -> Vec<ToolCall> {
        response.tool_calls.clone().unwrap_or_default()
    }

    /// Diagnostic aggregate over all requests this instance served.
    pub fn performance_summary(&self) -> PerformanceSummary {
        self.metrics.summary()
    }

    /// Assemble the wire request. Request-level parameters win over
    /// per-call options, which win over the configured defaults.
    #[allow(deprecated)] // max_tokens is what Foundry Local understands
    fn build_request(
        &self,
        model: &str,
        request: &ChatRequest,
        options: &CompletionOptions,
    ) -> Result<CreateChatCompletionRequest, ProviderError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(instructions) = request.instructions() {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(instructions)
                    .build()?
                    .into(),
            );
        }
        messages.extend(request.conversation()?);

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(model)
            .messages(messages)
            .max_tokens(
                request
                    .max_output_tokens
                    .or(options.max_tokens)
                    .unwrap_or(self.settings.max_tokens),
            )
            .temperature(
                request
                    .temperature
                    .or(options.temperature)
                    .unwrap_or(self.settings.temperature),
            );

        if !request.tools.is_empty() {
            builder
                .tools(
                    request
                        .tools
                        .iter()
                        .map(|tool| tool.to_wire())
                        .collect::<Vec<_>>(),
                )
                .tool_choice(
                    options
                        .tool_choice
                        .clone()
                        .unwrap_or(ChatCompletionToolChoiceOption::Auto),
                )
                .parallel_tool_calls(options.parallel_tool_calls.unwrap_or(true));
        }

        Ok(builder.build()?)
    }

    /// Record, log, and announce a failed request.
    async fn fail(
        &self,
        request_id: &str,
        model: &str,
        err: &ProviderError,
        elapsed: Duration,
    ) {
        let elapsed_ms = elapsed.as_millis() as u64;
        error!(
            request_id = %request_id,
            model = %model,
            elapsed_ms,
            kind = err.kind(),
            error = %err,
            "chat completion failed"
        );

        self.metrics.record(
            request_id,
            PerformanceRecord::failure(model.to_string(), elapsed_ms, err.to_string()),
        );

        self.emit(ProviderEvent::RequestError {
            provider: Self::NAME,
            request_id: request_id.to_string(),
            model: model.to_string(),
            error: err.to_string(),
            error_kind: err.kind(),
            elapsed_ms,
            timestamp: now_ts(),
            recoverable: err.is_recoverable(),
        })
        .await;
    }

    /// Best-effort hook emission; a failing bus never affects the result.
    async fn emit(&self, event: ProviderEvent) {
        let Some(hooks) = &self.hooks else { return };
        if let Err(e) = hooks.emit(event.name(), event.payload()).await {
            debug!(event = event.name(), error = %e, "hook emission failed");
        }
    }
}

/// Translate the vendor response into the framework shape.
fn translate_response(
    response: CreateChatCompletionResponse,
) -> Result<ChatResponse, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("response contained no choices".into()))?;
    let message = choice.message;

    let mut content = Vec::new();
    let mut tool_calls = Vec::new();

    if let Some(text) = message.content {
        if !text.is_empty() {
            content.push(ContentBlock::Text { text });
        }
    }

    if let Some(calls) = message.tool_calls {
        for call in calls {
            let arguments: serde_json::Value = serde_json::from_str(&call.function.arguments)
                .map_err(|e| {
                    ProviderError::MalformedResponse(format!(
                        "tool call arguments are not valid JSON: {e}"
                    ))
                })?;
            content.push(ContentBlock::ToolCall {
                id: call.id.clone(),
                name: call.function.name.clone(),
                input: arguments.clone(),
            });
            tool_calls.push(ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            });
        }
    }

    let usage = response
        .usage
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        content,
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
        usage,
        finish_reason: choice.finish_reason.map(finish_reason_tag),
    })
}

fn finish_reason_tag(reason: FinishReason) -> String {
    match reason {
        FinishReason::Stop => "stop",
        FinishReason::Length => "length",
        FinishReason::ToolCalls => "tool_calls",
        FinishReason::ContentFilter => "content_filter",
        FinishReason::FunctionCall => "function_call",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChatMessage, ToolSpec};
    use async_openai::types::ChatCompletionRequestMessage;
    use serde_json::json;

    fn test_provider(settings: FoundrySettings) -> FoundryLocalProvider {
        FoundryLocalProvider {
            settings,
            client: Client::with_config(OpenAIConfig::new()),
            http: reqwest::Client::new(),
            catalog: ModelCatalog::Static,
            hardware: None,
            hooks: None,
            metrics: PerformanceLog::default(),
        }
    }

    fn system_content(message: &ChatCompletionRequestMessage) -> Option<&str> {
        let ChatCompletionRequestMessage::System(system) = message else {
            return None;
        };
        match &system.content {
            async_openai::types::ChatCompletionRequestSystemMessageContent::Text(text) => {
                Some(text)
            }
            _ => None,
        }
    }

    #[test]
    fn test_system_message_hoisted_into_instructions() {
        let provider = test_provider(FoundrySettings::default());
        let request = ChatRequest::new(vec![
            ChatMessage::system("Be terse."),
            ChatMessage::user("Hi"),
        ]);

        let wire = provider
            .build_request("qwen2.5-7b-instruct-generic-gpu:4", &request, &CompletionOptions::default())
            .unwrap();

        assert_eq!(wire.messages.len(), 2);
        assert_eq!(system_content(&wire.messages[0]), Some("Be terse."));
        // Only the leading instructions message carries the system role
        assert!(!wire.messages[1..]
            .iter()
            .any(|m| matches!(m, ChatCompletionRequestMessage::System(_))));
    }

    #[test]
    fn test_two_tool_specs_produce_two_wire_tools() {
        let provider = test_provider(FoundrySettings::default());
        let request = ChatRequest::new(vec![ChatMessage::user("go")]).with_tools(vec![
            ToolSpec::new("first", "First tool", json!({"type": "object"})),
            ToolSpec::new("second", "Second tool", json!({"type": "object"})),
        ]);

        let wire = provider
            .build_request("m", &request, &CompletionOptions::default())
            .unwrap();

        let tools = wire.tools.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].function.name, "first");
        assert_eq!(tools[0].function.description.as_deref(), Some("First tool"));
        assert_eq!(tools[1].function.name, "second");
        assert!(matches!(
            wire.tool_choice,
            Some(ChatCompletionToolChoiceOption::Auto)
        ));
        assert_eq!(wire.parallel_tool_calls, Some(true));
    }

    #[test]
    fn test_no_tools_no_tool_fields() {
        let provider = test_provider(FoundrySettings::default());
        let request = ChatRequest::new(vec![ChatMessage::user("go")]);

        let wire = provider
            .build_request("m", &request, &CompletionOptions::default())
            .unwrap();
        assert!(wire.tools.is_none());
        assert!(wire.tool_choice.is_none());
        assert!(wire.parallel_tool_calls.is_none());
    }

    #[test]
    #[allow(deprecated)]
    fn test_generation_parameter_precedence() {
        let provider = test_provider(FoundrySettings {
            max_tokens: 2048,
            temperature: 0.7,
            ..Default::default()
        });

        // Request-level values win
        let request = ChatRequest::new(vec![ChatMessage::user("go")])
            .with_max_output_tokens(99)
            .with_temperature(0.1);
        let options = CompletionOptions {
            max_tokens: Some(500),
            temperature: Some(0.5),
            ..Default::default()
        };
        let wire = provider.build_request("m", &request, &options).unwrap();
        assert_eq!(wire.max_tokens, Some(99));
        assert_eq!(wire.temperature, Some(0.1));

        // Then options, then settings
        let request = ChatRequest::new(vec![ChatMessage::user("go")]);
        let wire = provider.build_request("m", &request, &options).unwrap();
        assert_eq!(wire.max_tokens, Some(500));

        let wire = provider
            .build_request("m", &request, &CompletionOptions::default())
            .unwrap();
        assert_eq!(wire.max_tokens, Some(2048));
        assert_eq!(wire.temperature, Some(0.7));
    }

    #[test]
    fn test_translate_text_response() {
        let response: CreateChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "qwen2.5-7b-instruct-generic-gpu:4",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello!"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 15, "total_tokens": 25}
        }))
        .unwrap();

        let chat = translate_response(response).unwrap();
        assert_eq!(chat.text(), "Hello!");
        assert!(chat.tool_calls.is_none());
        assert_eq!(chat.usage.input_tokens, 10);
        assert_eq!(chat.usage.output_tokens, 15);
        assert_eq!(chat.usage.total_tokens, 25);
        assert_eq!(chat.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_translate_tool_call_response() {
        let response: CreateChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-2",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "m",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "do_thing", "arguments": "{\"arg1\":\"value1\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12}
        }))
        .unwrap();

        let chat = translate_response(response).unwrap();
        let calls = chat.tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_abc");
        assert_eq!(calls[0].name, "do_thing");
        assert_eq!(calls[0].arguments, json!({"arg1": "value1"}));
        assert_eq!(chat.finish_reason.as_deref(), Some("tool_calls"));
        assert!(matches!(
            chat.content[0],
            ContentBlock::ToolCall { .. }
        ));
    }

    #[test]
    fn test_translate_rejects_empty_choices() {
        let response: CreateChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-3",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "m",
            "choices": []
        }))
        .unwrap();

        let err = translate_response(response).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn test_translate_rejects_invalid_tool_arguments() {
        let response: CreateChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-4",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "m",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "call_bad",
                        "type": "function",
                        "function": {"name": "do_thing", "arguments": "{not json"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let err = translate_response(response).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_tool_calls() {
        let provider = test_provider(FoundrySettings::default());
        let response = ChatResponse {
            content: Vec::new(),
            tool_calls: Some(vec![ToolCall {
                id: "call_1".to_string(),
                name: "t".to_string(),
                arguments: json!({}),
            }]),
            usage: Usage::default(),
            finish_reason: None,
        };
        assert_eq!(provider.parse_tool_calls(&response).len(), 1);

        let response = ChatResponse {
            content: Vec::new(),
            tool_calls: None,
            usage: Usage::default(),
            finish_reason: None,
        };
        assert!(provider.parse_tool_calls(&response).is_empty());
    }

    #[test]
    fn test_get_info_metadata() {
        let provider = test_provider(FoundrySettings::default());
        let info = provider.get_info();

        assert_eq!(info.id, "foundry-local");
        assert_eq!(info.display_name, "Microsoft Foundry Local");
        assert!(info.credential_env_vars.is_empty());
        for tag in ["streaming", "tools", "offline", "hardware_optimized"] {
            assert!(info.capabilities.iter().any(|c| c == tag), "missing {tag}");
        }
        assert_eq!(info.defaults.model, DEFAULT_MODEL);

        let field_ids: Vec<&str> = info.config_fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(
            field_ids,
            vec!["default_model", "auto_hardware_optimization", "offline_mode"]
        );
        assert_eq!(info.config_fields[0].field_type, FieldType::Choice);
        assert_eq!(info.config_fields[1].field_type, FieldType::Boolean);
    }

    #[test]
    fn test_default_model_comes_from_constant() {
        let provider = test_provider(FoundrySettings::from_value(&json!({})));
        assert_eq!(provider.settings().default_model, DEFAULT_MODEL);
        assert_eq!(provider.get_info().defaults.model, DEFAULT_MODEL);
    }
}
