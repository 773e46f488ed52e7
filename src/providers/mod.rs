pub mod client;
pub mod registry;
pub mod wire;

pub use registry::ModelRegistry;

/// Where the system prompt travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// OpenAI-style chat completions: the system prompt is a message at
    /// index 0 of the message list; replies arrive as
    /// `choices[0].message.content`.
    ChatCompletions,
    /// Anthropic-style messages: the system prompt is a separate `system`
    /// request field; replies arrive as `content[0].text`.
    AnthropicMessages,
}

impl WireFormat {
    pub fn embeds_system(self) -> bool {
        matches!(self, WireFormat::ChatCompletions)
    }
}

/// How request headers derive from the provider credential.
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-api-key: <key>` plus a pinned API version header
    XApiKey { version: &'static str },
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub id: String,
    /// Full URL of the POST target.
    pub endpoint: String,
    pub wire: WireFormat,
    pub auth: AuthScheme,
    /// Credential key: names the config section and the *_API_KEY
    /// environment variable.
    pub provider: String,
}

impl ModelConfig {
    pub fn openai(id: impl Into<String>, base_url: &str) -> Self {
        Self {
            id: id.into(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            wire: WireFormat::ChatCompletions,
            auth: AuthScheme::Bearer,
            provider: "openai".to_string(),
        }
    }

    pub fn anthropic(id: impl Into<String>, base_url: &str) -> Self {
        Self {
            id: id.into(),
            endpoint: format!("{}/messages", base_url.trim_end_matches('/')),
            wire: WireFormat::AnthropicMessages,
            auth: AuthScheme::XApiKey {
                version: "2023-06-01",
            },
            provider: "anthropic".to_string(),
        }
    }

    pub fn build_headers(&self, api_key: &str) -> Vec<(String, String)> {
        match &self.auth {
            AuthScheme::Bearer => vec![(
                "Authorization".to_string(),
                format!("Bearer {}", api_key),
            )],
            AuthScheme::XApiKey { version } => vec![
                ("x-api-key".to_string(), api_key.to_string()),
                ("anthropic-version".to_string(), version.to_string()),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_headers() {
        let model = ModelConfig::openai("gpt-4.1-mini", "https://api.openai.com/v1");
        let headers = model.build_headers("sk-test");
        assert_eq!(
            headers,
            vec![("Authorization".to_string(), "Bearer sk-test".to_string())]
        );
        assert_eq!(model.endpoint, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn x_api_key_headers_carry_version() {
        let model = ModelConfig::anthropic("claude-sonnet-4-20250514", "https://api.anthropic.com/v1");
        let headers = model.build_headers("sk-ant-test");
        assert_eq!(headers[0], ("x-api-key".to_string(), "sk-ant-test".to_string()));
        assert_eq!(
            headers[1],
            ("anthropic-version".to_string(), "2023-06-01".to_string())
        );
    }
}
