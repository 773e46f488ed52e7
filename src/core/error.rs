use std::io;
use thiserror::Error;

/// Unified error type for the dchat application
#[derive(Error, Debug)]
pub enum DchatError {
    /// No API key configured for the provider backing the active model
    #[error(
        "no API key configured for provider '{0}'; add it to ~/.dchat/config.yaml or set the matching *_API_KEY environment variable"
    )]
    MissingCredentials(String),

    /// Droid id not present in the registry
    #[error("unknown droid: '{0}' (run /droids to list registered droids)")]
    UnknownDroid(String),

    /// Model id not present in the registry
    #[error("unknown model: '{0}' (run /models to list registered models)")]
    UnknownModel(String),

    /// Network/transport failure while talking to the provider
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body did not match the provider's wire shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(String),

    /// User input errors
    #[error("input error: {0}")]
    Input(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for DchatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DchatError::Transport(format!("request timed out: {}", err))
        } else if err.is_connect() {
            DchatError::Transport(format!("connection failed: {}", err))
        } else if err.is_status() {
            DchatError::Transport(format!("provider returned error status: {}", err))
        } else {
            DchatError::Transport(format!("request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for DchatError {
    fn from(err: serde_json::Error) -> Self {
        DchatError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for DchatError {
    fn from(err: serde_yml::Error) -> Self {
        DchatError::Serialization(format!("YAML error: {}", err))
    }
}
