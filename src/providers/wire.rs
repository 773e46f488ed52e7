use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::DchatError;
use crate::core::message::{Message, Role};
use crate::providers::WireFormat;

pub const TEMPERATURE: f64 = 0.7;
pub const MAX_TOKENS: u32 = 1024;

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

impl WireMessage {
    fn from_message(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

/// Build the provider-specific JSON body for one turn.
///
/// For `AnthropicMessages` the system prompt travels out-of-band in the
/// `system` field and any system message in the log is filtered out; for
/// `ChatCompletions` the log is sent as-is (the dispatcher has already
/// seeded the system message at index 0).
pub fn build_request(
    wire: WireFormat,
    model_id: &str,
    messages: &[Message],
    system: Option<&str>,
) -> Result<Value, DchatError> {
    let value = match wire {
        WireFormat::ChatCompletions => serde_json::to_value(ChatCompletionRequest {
            model: model_id.to_string(),
            messages: messages.iter().map(WireMessage::from_message).collect(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: false,
        })?,
        WireFormat::AnthropicMessages => serde_json::to_value(AnthropicRequest {
            model: model_id.to_string(),
            messages: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(WireMessage::from_message)
                .collect(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: false,
            system: system.map(|s| s.to_string()),
        })?,
    };
    Ok(value)
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

/// Extract the reply text from a provider response body.
pub fn parse_reply(wire: WireFormat, body: &str) -> Result<String, DchatError> {
    match wire {
        WireFormat::ChatCompletions => {
            let parsed: ChatCompletionResponse = serde_json::from_str(body)
                .map_err(|e| DchatError::MalformedResponse(format!("chat completions body: {}", e)))?;
            parsed
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| {
                    DchatError::MalformedResponse("no choices in response".to_string())
                })
        }
        WireFormat::AnthropicMessages => {
            let parsed: AnthropicResponse = serde_json::from_str(body)
                .map_err(|e| DchatError::MalformedResponse(format!("messages body: {}", e)))?;
            parsed
                .content
                .into_iter()
                .next()
                .map(|block| block.text)
                .ok_or_else(|| {
                    DchatError::MalformedResponse("no content blocks in response".to_string())
                })
        }
    }
}
