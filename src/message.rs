//! Framework-internal chat shapes and their OpenAI wire translation.
//!
//! Requests store semantic messages, not wire format; the wire request is
//! derived fresh on every call. System messages never enter the conversation
//! array: they are concatenated into a single instructions string and sent
//! as one leading system message.

use crate::error::ProviderError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, FunctionObject,
};
use serde::{Deserialize, Serialize};

/// Message role within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Name of the tool that produced this message (tool role only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Identifier of the tool call this message answers (tool role only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_name: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_name: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_name: None,
            tool_call_id: None,
        }
    }

    pub fn tool(
        tool_name: impl Into<String>,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_name: Some(tool_name.into()),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Specification of a tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's arguments.
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            parameters,
        }
    }

    /// OpenAI `{type: "function"}` tool entry.
    pub fn to_wire(&self) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: self.name.clone(),
                description: Some(self.description.clone().unwrap_or_default()),
                parameters: Some(self.parameters.clone()),
                strict: None,
            },
        }
    }
}

/// A chat completion request as the host framework sees it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Concatenation of all system messages, if any.
    pub fn instructions(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Translate the non-system messages to wire format, in order.
    ///
    /// Tool results become OpenAI tool messages whose content is prefixed
    /// with the originating tool name.
    pub fn conversation(&self) -> Result<Vec<ChatCompletionRequestMessage>, ProviderError> {
        let mut wire = Vec::with_capacity(self.messages.len());

        for message in &self.messages {
            match message.role {
                Role::System => continue,
                Role::User => {
                    wire.push(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(message.content.clone())
                            .build()?
                            .into(),
                    );
                }
                Role::Assistant => {
                    wire.push(
                        ChatCompletionRequestAssistantMessageArgs::default()
                            .content(message.content.clone())
                            .build()?
                            .into(),
                    );
                }
                Role::Tool => {
                    let tool_name = message.tool_name.as_deref().unwrap_or("unknown");
                    wire.push(
                        ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(message.tool_call_id.clone().unwrap_or_default())
                            .content(format!("[Tool: {}]\n{}", tool_name, message.content))
                            .build()?
                            .into(),
                    );
                }
            }
        }

        Ok(wire)
    }
}

/// One block of response content, in model output order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

/// A structured function invocation emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Token accounting for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// A chat completion response in framework shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// Concatenated text of all text blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_messages_become_instructions() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("You are a helpful assistant."),
            ChatMessage::user("Hello"),
        ]);

        assert_eq!(
            request.instructions().as_deref(),
            Some("You are a helpful assistant.")
        );

        let conversation = request.conversation().unwrap();
        assert_eq!(conversation.len(), 1);
        assert!(!conversation
            .iter()
            .any(|m| matches!(m, ChatCompletionRequestMessage::System(_))));
    }

    #[test]
    fn test_multiple_system_messages_concatenated() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("First."),
            ChatMessage::user("Hi"),
            ChatMessage::system("Second."),
        ]);
        assert_eq!(request.instructions().as_deref(), Some("First.\n\nSecond."));
    }

    #[test]
    fn test_no_system_messages_no_instructions() {
        let request = ChatRequest::new(vec![ChatMessage::user("Hi")]);
        assert!(request.instructions().is_none());
    }

    #[test]
    fn test_tool_message_prefixed_with_tool_name() {
        let request = ChatRequest::new(vec![
            ChatMessage::user("List the directory"),
            ChatMessage::assistant("Running the tool"),
            ChatMessage::tool("list_directory", "call_1", "file1.txt\nfile2.txt"),
        ]);

        let conversation = request.conversation().unwrap();
        assert_eq!(conversation.len(), 3);

        let ChatCompletionRequestMessage::Tool(tool_msg) = &conversation[2] else {
            panic!("expected tool message");
        };
        assert_eq!(tool_msg.tool_call_id, "call_1");
        let async_openai::types::ChatCompletionRequestToolMessageContent::Text(content) =
            &tool_msg.content
        else {
            panic!("expected text content");
        };
        assert!(content.starts_with("[Tool: list_directory]\n"));
        assert!(content.contains("file1.txt"));
    }

    #[test]
    fn test_tool_spec_wire_format() {
        let spec = ToolSpec::new(
            "get_weather",
            "Get the current weather",
            json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        );

        let wire = spec.to_wire();
        assert_eq!(wire.r#type, ChatCompletionToolType::Function);
        assert_eq!(wire.function.name, "get_weather");
        assert_eq!(
            wire.function.description.as_deref(),
            Some("Get the current weather")
        );
        assert_eq!(
            wire.function.parameters,
            Some(json!({"type": "object", "properties": {"city": {"type": "string"}}}))
        );
    }

    #[test]
    fn test_tool_spec_without_description() {
        let spec = ToolSpec {
            name: "noop".to_string(),
            description: None,
            parameters: json!({}),
        };
        assert_eq!(spec.to_wire().function.description.as_deref(), Some(""));
    }

    #[test]
    fn test_response_text_concatenation() {
        let response = ChatResponse {
            content: vec![
                ContentBlock::Text {
                    text: "Hello".to_string(),
                },
                ContentBlock::ToolCall {
                    id: "call_1".to_string(),
                    name: "noop".to_string(),
                    input: json!({}),
                },
                ContentBlock::Text {
                    text: " world".to_string(),
                },
            ],
            tool_calls: None,
            usage: Usage::default(),
            finish_reason: Some("stop".to_string()),
        };
        assert_eq!(response.text(), "Hello world");
    }
}
