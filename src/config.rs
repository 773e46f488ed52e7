use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::DchatError;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// A droid defined in the config file. Registered after the built-ins at
/// startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroidConfig {
    pub id: String,
    pub system_prompt: String,
    pub prompt_prefix: Option<String>,
    pub prompt_suffix: Option<String>,
    /// Append a diff view of prompt vs. reply after each turn.
    #[serde(default)]
    pub show_diff: bool,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Config {
    pub default_droid: Option<String>,
    pub default_model: Option<String>,
    /// Append completed turns to ~/.dchat/transcript.log
    #[serde(default)]
    pub transcript: bool,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub droids: Vec<DroidConfig>,
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".dchat")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    pub fn transcript_path() -> PathBuf {
        Self::config_dir().join("transcript.log")
    }

    pub fn history_path() -> PathBuf {
        Self::config_dir().join("input_history.txt")
    }

    pub fn load() -> Result<Config, DchatError> {
        let path = Self::config_path();

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config = serde_yml::from_str::<Config>(&contents)
                .map_err(|e| DchatError::Config(format!("parse {}: {}", path.display(), e)))?;
            return Ok(config);
        }

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let config = Config::default();
        let _ = config.save();
        Ok(config)
    }

    pub fn save(&self) -> Result<(), DchatError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(&path, yaml_content)?;
        Ok(())
    }

    pub fn base_url_for(&self, provider: &str, default: &str) -> String {
        self.providers
            .get(provider)
            .and_then(|p| p.base_url.clone())
            .unwrap_or_else(|| default.to_string())
    }
}

/// Resolved API keys, provider name -> secret. Config entries win over the
/// environment.
#[derive(Debug, Default, Clone)]
pub struct Credentials {
    keys: HashMap<String, String>,
}

impl Credentials {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Gather keys for every configured provider plus the built-in ones,
    /// falling back to `<PROVIDER>_API_KEY` in the environment.
    pub fn resolve(config: &Config) -> Self {
        let mut credentials = Self::empty();

        let mut providers: Vec<&str> = vec!["openai", "anthropic"];
        for name in config.providers.keys() {
            if !providers.contains(&name.as_str()) {
                providers.push(name.as_str());
            }
        }

        for provider in providers {
            let from_config = config
                .providers
                .get(provider)
                .and_then(|p| p.api_key.clone());
            let key = from_config.or_else(|| {
                env::var(format!("{}_API_KEY", provider.to_uppercase())).ok()
            });
            if let Some(key) = key {
                if !key.trim().is_empty() {
                    credentials.set(provider, key);
                }
            }
        }

        credentials
    }

    pub fn set(&mut self, provider: &str, key: impl Into<String>) {
        self.keys.insert(provider.to_string(), key.into());
    }

    pub fn get(&self, provider: &str) -> Option<&str> {
        self.keys.get(provider).map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_keys_win_over_missing_env() {
        let mut config = Config::default();
        config.providers.insert(
            "openai".to_string(),
            ProviderConfig {
                api_key: Some("sk-from-config".to_string()),
                base_url: None,
            },
        );

        let credentials = Credentials::resolve(&config);
        assert_eq!(credentials.get("openai"), Some("sk-from-config"));
    }

    #[test]
    fn blank_keys_are_ignored() {
        let mut config = Config::default();
        config.providers.insert(
            "openai".to_string(),
            ProviderConfig {
                api_key: Some("   ".to_string()),
                base_url: None,
            },
        );

        let credentials = Credentials::resolve(&config);
        assert_eq!(credentials.get("openai"), None);
    }

    #[test]
    fn base_url_override() {
        let mut config = Config::default();
        config.providers.insert(
            "anthropic".to_string(),
            ProviderConfig {
                api_key: None,
                base_url: Some("http://localhost:9999/v1".to_string()),
            },
        );

        assert_eq!(
            config.base_url_for("anthropic", "https://api.anthropic.com/v1"),
            "http://localhost:9999/v1"
        );
        assert_eq!(
            config.base_url_for("openai", "https://api.openai.com/v1"),
            "https://api.openai.com/v1"
        );
    }

    #[test]
    fn config_roundtrips_through_yaml() {
        let mut config = Config::default();
        config.default_droid = Some("rewriter".to_string());
        config.droids.push(DroidConfig {
            id: "pirate".to_string(),
            system_prompt: "You are a pirate.".to_string(),
            prompt_prefix: Some("Arr: ".to_string()),
            prompt_suffix: None,
            show_diff: false,
        });

        let yaml = serde_yml::to_string(&config).unwrap();
        let parsed: Config = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.default_droid.as_deref(), Some("rewriter"));
        assert_eq!(parsed.droids.len(), 1);
        assert_eq!(parsed.droids[0].prompt_prefix.as_deref(), Some("Arr: "));
    }
}
