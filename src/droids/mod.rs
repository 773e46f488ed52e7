pub mod registry;

pub use registry::DroidRegistry;

use std::sync::Arc;

use crate::engine::pipeline::{Processor, ShowDiff};

/// A named persona: a system prompt plus optional first-turn framing and
/// extra pre/post-processors appended after the global defaults.
pub struct Droid {
    pub id: String,
    pub system_prompt: String,
    pub prompt_prefix: Option<String>,
    pub prompt_suffix: Option<String>,
    pub pre: Vec<Arc<dyn Processor>>,
    pub post: Vec<Arc<dyn Processor>>,
}

impl Droid {
    pub fn new(id: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            system_prompt: system_prompt.into(),
            prompt_prefix: None,
            prompt_suffix: None,
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    pub fn with_framing(mut self, prefix: Option<String>, suffix: Option<String>) -> Self {
        self.prompt_prefix = prefix;
        self.prompt_suffix = suffix;
        self
    }

    pub fn with_post(mut self, processor: Arc<dyn Processor>) -> Self {
        self.post.push(processor);
        self
    }

    /// First-turn framing: prefix and suffix wrap the prompt verbatim.
    pub fn frame(&self, prompt: &str) -> String {
        let mut framed = String::new();
        if let Some(prefix) = &self.prompt_prefix {
            framed.push_str(prefix);
        }
        framed.push_str(prompt);
        if let Some(suffix) = &self.prompt_suffix {
            framed.push_str(suffix);
        }
        framed
    }
}

impl std::fmt::Debug for Droid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Droid")
            .field("id", &self.id)
            .field("system_prompt", &self.system_prompt)
            .field("prompt_prefix", &self.prompt_prefix)
            .field("prompt_suffix", &self.prompt_suffix)
            .finish()
    }
}

/// Droids available out of the box. Config-defined droids are registered on
/// top of these at startup.
pub fn builtin_droids() -> Vec<Droid> {
    vec![
        Droid::new("assistant", "You are a helpful assistant."),
        Droid::new(
            "concise",
            "You are a helpful assistant. Answer in as few words as accuracy allows.",
        )
        .with_framing(Some("Answer concisely: ".to_string()), None),
        Droid::new(
            "rewriter",
            "You are a careful copy editor. Return only the rewritten text, with no commentary.",
        )
        .with_post(Arc::new(ShowDiff)),
    ]
}
