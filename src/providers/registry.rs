use std::sync::Arc;

use crate::core::error::DchatError;
use crate::providers::ModelConfig;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Registry of available model configurations, keyed by model id.
pub struct ModelRegistry {
    models: Vec<Arc<ModelConfig>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Registry pre-loaded with the built-in models, with endpoints rooted
    /// at the given base URLs (config may override the defaults).
    pub fn with_builtins(openai_base_url: &str, anthropic_base_url: &str) -> Self {
        let mut registry = Self::new();
        let _ = registry.register(ModelConfig::openai("gpt-4.1-mini", openai_base_url));
        let _ = registry.register(ModelConfig::anthropic(
            "claude-sonnet-4-20250514",
            anthropic_base_url,
        ));
        registry
    }

    pub fn register(&mut self, model: ModelConfig) -> Result<(), DchatError> {
        if model.id.trim().is_empty() {
            return Err(DchatError::Config("model id must not be empty".to_string()));
        }
        if !model.endpoint.starts_with("http://") && !model.endpoint.starts_with("https://") {
            return Err(DchatError::Config(format!(
                "model '{}' has a non-http endpoint: {}",
                model.id, model.endpoint
            )));
        }
        if self.models.iter().any(|m| m.id == model.id) {
            return Err(DchatError::Config(format!(
                "model '{}' is already registered",
                model.id
            )));
        }
        self.models.push(Arc::new(model));
        Ok(())
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<ModelConfig>, DchatError> {
        self.models
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| DchatError::UnknownModel(id.to_string()))
    }

    pub fn ids(&self) -> Vec<String> {
        self.models.iter().map(|m| m.id.clone()).collect()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtins(DEFAULT_OPENAI_BASE_URL, DEFAULT_ANTHROPIC_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_unknown_model_fails() {
        let registry = ModelRegistry::default();
        let err = registry.resolve("gpt-nonexistent").unwrap_err();
        assert!(matches!(err, DchatError::UnknownModel(id) if id == "gpt-nonexistent"));
    }

    #[test]
    fn bad_endpoint_rejected_at_registration() {
        let mut registry = ModelRegistry::new();
        let err = registry
            .register(ModelConfig::openai("local", "file:///tmp"))
            .unwrap_err();
        assert!(matches!(err, DchatError::Config(_)));
    }

    #[test]
    fn base_url_override_reroots_endpoint() {
        let registry = ModelRegistry::with_builtins(
            "http://localhost:8080/v1",
            DEFAULT_ANTHROPIC_BASE_URL,
        );
        let model = registry.resolve("gpt-4.1-mini").unwrap();
        assert_eq!(model.endpoint, "http://localhost:8080/v1/chat/completions");
    }
}
