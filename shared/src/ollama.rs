//! Local VLM backend speaking the Ollama wire protocol.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::VlmConfig;
use crate::error::{Error, Result};
use crate::extract::{parse_bill_data, parse_insight_response};
use crate::insights::{heuristic_insights, should_generate_insights};
use crate::models::{
    BillScanResult, ExtractedBillData, InsightResponse, ProviderKind, ProviderStatus,
};
use crate::prompt;
use crate::providers::{ScanInput, VlmProvider};

/// Hard cap on a single generation request. Vision models on modest
/// hardware can take minutes on large scans; past this we cancel and
/// surface a distinguishable timeout warning.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Bounded output and near-greedy sampling favor parseable JSON over
/// creative completions.
const NUM_PREDICT: u32 = 1024;
const TEMPERATURE: f64 = 0.1;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Match a configured model against an installed tag name. Installed
/// names usually carry a version suffix ("moondream:latest"), so the
/// comparison accepts an exact match or a matching base name.
fn model_matches(configured: &str, installed: &str) -> bool {
    installed == configured
        || installed.split(':').next() == Some(configured)
        || configured.split(':').next() == Some(installed)
}

/// Self-hosted vision model server adapter.
pub struct OllamaProvider {
    http: reqwest::Client,
    base_url: String,
    model: String,
    text_model: Option<String>,
}

impl OllamaProvider {
    pub fn new(config: &VlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.ollama_base_url.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
            text_model: config.ollama_text_model.clone(),
        })
    }

    /// List installed model tags from the server.
    async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Ollama is not reachable: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "Ollama returned {} from /api/tags",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Invalid /api/tags response: {e}")))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// One generation round-trip. Timeouts map to a distinguishable
    /// message so callers can suggest the right remediation.
    async fn generate(&self, model: &str, prompt: &str, images: Option<Vec<String>>) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            images,
            stream: false,
            options: GenerateOptions {
                num_predict: NUM_PREDICT,
                temperature: TEMPERATURE,
            },
        };

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Provider("Ollama request timed out".to_string())
            } else {
                Error::Provider(format!("Ollama request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Ollama returned {status}: {detail}"
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Invalid Ollama response: {e}")))?;

        Ok(generated.response)
    }

    async fn scan_inner(&self, input: &ScanInput) -> Result<BillScanResult> {
        let vision_prompt;
        let text_prompt;
        let (prompt, images): (&str, Option<Vec<String>>) = match input {
            ScanInput::Text(text) => {
                text_prompt = prompt::extraction_prompt_for_text(text);
                (&text_prompt, None)
            }
            ScanInput::Binary { mime_type, data }
                if mime_type.starts_with("image/") || mime_type == "application/pdf" =>
            {
                vision_prompt = prompt::extraction_prompt();
                (&vision_prompt, Some(vec![BASE64.encode(data)]))
            }
            ScanInput::Binary { mime_type, .. } => {
                return Ok(BillScanResult::failure(format!(
                    "Unsupported file type: {mime_type}"
                ))
                .with_provider(ProviderKind::Local));
            }
        };

        let raw = self.generate(&self.model, prompt, images).await?;
        debug!(chars = raw.len(), "Ollama scan reply received");

        let Some(parsed) = parse_bill_data(&raw) else {
            let mut result =
                BillScanResult::failure("Could not find valid JSON in the model response")
                    .with_provider(ProviderKind::Local);
            result.raw_text = Some(raw);
            return Ok(result);
        };

        let insights = if should_generate_insights(&parsed.data) {
            Some(self.generate_insights(&parsed.data).await)
        } else {
            None
        };

        Ok(BillScanResult {
            success: true,
            extracted_data: Some(parsed.data),
            insights,
            confidence: parsed.confidence,
            warnings: parsed.warnings,
            raw_text: Some(raw),
            provider: Some(ProviderKind::Local),
        })
    }
}

#[async_trait::async_trait]
impl VlmProvider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn is_available(&self) -> bool {
        match self.list_models().await {
            Ok(models) => models.iter().any(|name| model_matches(&self.model, name)),
            Err(_) => false,
        }
    }

    async fn status(&self) -> ProviderStatus {
        match self.list_models().await {
            Ok(models) => {
                let matched = models
                    .iter()
                    .find(|name| model_matches(&self.model, name))
                    .cloned();
                match matched {
                    Some(name) => ProviderStatus {
                        provider: ProviderKind::Local,
                        available: true,
                        model: Some(name),
                        error: None,
                    },
                    None => ProviderStatus {
                        provider: ProviderKind::Local,
                        available: false,
                        model: None,
                        error: Some(format!(
                            "Model '{}' is not installed on the Ollama server",
                            self.model
                        )),
                    },
                }
            }
            Err(e) => ProviderStatus {
                provider: ProviderKind::Local,
                available: false,
                model: None,
                error: Some(e.to_string()),
            },
        }
    }

    async fn scan_bill(&self, input: &ScanInput) -> BillScanResult {
        match self.scan_inner(input).await {
            Ok(result) => result,
            Err(e) => BillScanResult::failure(e.to_string()).with_provider(ProviderKind::Local),
        }
    }

    async fn generate_insights(&self, data: &ExtractedBillData) -> InsightResponse {
        let model = self.text_model.as_deref().unwrap_or(&self.model);
        let prompt = prompt::insight_prompt(data);

        match self.generate(model, &prompt, None).await {
            Ok(raw) => match parse_insight_response(&raw) {
                Some(insights) => insights,
                None => {
                    warn!("Ollama insight reply had no parseable JSON, using heuristic");
                    heuristic_insights(data)
                }
            },
            Err(e) => {
                warn!("Ollama insight call failed ({e}), using heuristic");
                heuristic_insights(data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_matches_handles_version_tags() {
        assert!(model_matches("moondream", "moondream"));
        assert!(model_matches("moondream", "moondream:latest"));
        assert!(model_matches("moondream:latest", "moondream"));
        assert!(model_matches("llava", "llava:13b"));
        assert!(!model_matches("moondream", "llava:latest"));
        assert!(!model_matches("moondream", "moondream2"));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = VlmConfig {
            ollama_base_url: "http://localhost:11434/".to_string(),
            ..Default::default()
        };
        let provider = OllamaProvider::new(&config).unwrap();
        assert_eq!(provider.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_unsupported_mime_fails_without_network() {
        let provider = OllamaProvider::new(&VlmConfig::default()).unwrap();
        let input = ScanInput::Binary {
            mime_type: "application/zip".to_string(),
            data: vec![0x50, 0x4b],
        };
        let result = provider.scan_bill(&input).await;
        assert!(!result.success);
        assert!(result.warnings[0].contains("Unsupported file type"));
        // Failures are still tagged so the orchestrator can report
        // which backend was active.
        assert_eq!(result.provider, Some(ProviderKind::Local));
    }

    #[test]
    fn test_generate_request_wire_shape() {
        let body = GenerateRequest {
            model: "moondream",
            prompt: "p",
            images: Some(vec!["aGk=".to_string()]),
            stream: false,
            options: GenerateOptions {
                num_predict: NUM_PREDICT,
                temperature: TEMPERATURE,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 1024);
        assert_eq!(json["images"][0], "aGk=");
    }
}
