//! Configuration for the VLM scanning service.

use std::env;

use serde::{Deserialize, Serialize};

/// Which backend the operator has asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Prefer local, fall back to cloud.
    Auto,
    /// Local only; fail explicitly if it is down.
    Local,
    /// Cloud only; fail explicitly if unconfigured.
    Cloud,
}

/// VLM backend configuration loaded from environment variables.
///
/// Environment reading is isolated here; every other module receives
/// this struct at construction.
#[derive(Debug, Clone)]
pub struct VlmConfig {
    pub mode: ProviderMode,
    /// Base URL of the Ollama server.
    pub ollama_base_url: String,
    /// Vision-capable model used for bill extraction.
    pub ollama_model: String,
    /// Optional text-only model for insight generation; falls back to
    /// the vision model when unset.
    pub ollama_text_model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl VlmConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mode = match env::var("VLM_PROVIDER").as_deref() {
            Ok("local") | Ok("ollama") => ProviderMode::Local,
            Ok("cloud") | Ok("gemini") => ProviderMode::Cloud,
            _ => ProviderMode::Auto,
        };

        Self {
            mode,
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "moondream".to_string()),
            ollama_text_model: env::var("OLLAMA_TEXT_MODEL").ok().filter(|m| !m.is_empty()),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
        }
    }
}

impl Default for VlmConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::Auto,
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "moondream".to_string(),
            ollama_text_model: None,
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VlmConfig::default();
        assert_eq!(config.mode, ProviderMode::Auto);
        assert_eq!(config.ollama_base_url, "http://localhost:11434");
        assert_eq!(config.ollama_model, "moondream");
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ProviderMode::Auto).unwrap(), r#""auto""#);
    }
}
