//! Hosted cloud VLM backend (Gemini `generateContent` REST API).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
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
use crate::retry::with_default_retry;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const MAX_OUTPUT_TOKENS: u32 = 2048;
const TEMPERATURE: f64 = 0.1;

/// All harm categories disabled: bill documents are benign and safety
/// blocks would otherwise eat the JSON reply.
const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Hosted VLM adapter, used as the fallback when the local server is
/// down. Availability is just "a credential is configured" — there is
/// no cheap liveness probe for the hosted API.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiProvider {
    pub fn new(config: &VlmConfig) -> Self {
        Self {
            // No per-call timeout here: the hosted API bounds itself and
            // the retry helper provides the only local time-bound.
            http: reqwest::Client::new(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
        }
    }

    fn safety_settings() -> Value {
        Value::Array(
            HARM_CATEGORIES
                .iter()
                .map(|category| json!({"category": category, "threshold": "BLOCK_NONE"}))
                .collect(),
        )
    }

    /// One `generateContent` round-trip, no retry. The error text keeps
    /// the HTTP status and body so the retry helper can recognize
    /// rate-limit shapes ("429", "quota", "resource exhausted").
    async fn generate_content(&self, parts: &Value) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Error::Config("GEMINI_API_KEY is not set".to_string()));
        };

        let url = format!("{API_BASE}/models/{}:generateContent?key={api_key}", self.model);
        let body = json!({
            "contents": [{"parts": parts}],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            },
            "safetySettings": Self::safety_settings(),
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("Gemini returned {status}: {detail}")));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Invalid Gemini response: {e}")))?;

        let text = reply["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Provider(
                "Gemini reply contained no text candidates".to_string(),
            ));
        }

        Ok(text)
    }

    /// `generate_content` behind the rate-limit retry budget.
    async fn generate_with_retry(&self, parts: Value) -> Result<String> {
        with_default_retry(|| self.generate_content(&parts)).await
    }

    async fn scan_inner(&self, input: &ScanInput) -> Result<BillScanResult> {
        let parts = match input {
            ScanInput::Text(text) => {
                json!([{"text": prompt::extraction_prompt_for_text(text)}])
            }
            ScanInput::Binary { mime_type, data }
                if mime_type.starts_with("image/") || mime_type == "application/pdf" =>
            {
                json!([
                    {"text": prompt::extraction_prompt()},
                    {"inline_data": {"mime_type": mime_type, "data": BASE64.encode(data)}},
                ])
            }
            ScanInput::Binary { mime_type, .. } => {
                return Ok(BillScanResult::failure(format!(
                    "Unsupported file type: {mime_type}"
                ))
                .with_provider(ProviderKind::Cloud));
            }
        };

        let raw = self.generate_with_retry(parts).await?;
        debug!(chars = raw.len(), "Gemini scan reply received");

        let Some(parsed) = parse_bill_data(&raw) else {
            let mut result =
                BillScanResult::failure("Could not find valid JSON in the model response")
                    .with_provider(ProviderKind::Cloud);
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
            provider: Some(ProviderKind::Cloud),
        })
    }
}

#[async_trait::async_trait]
impl VlmProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Cloud
    }

    async fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    async fn status(&self) -> ProviderStatus {
        if self.is_available().await {
            ProviderStatus {
                provider: ProviderKind::Cloud,
                available: true,
                model: Some(self.model.clone()),
                error: None,
            }
        } else {
            ProviderStatus {
                provider: ProviderKind::Cloud,
                available: false,
                model: None,
                error: Some("GEMINI_API_KEY is not set".to_string()),
            }
        }
    }

    async fn scan_bill(&self, input: &ScanInput) -> BillScanResult {
        match self.scan_inner(input).await {
            Ok(result) => result,
            Err(e) => BillScanResult::failure(e.to_string()).with_provider(ProviderKind::Cloud),
        }
    }

    async fn generate_insights(&self, data: &ExtractedBillData) -> InsightResponse {
        let parts = json!([{"text": prompt::insight_prompt(data)}]);

        match self.generate_with_retry(parts).await {
            Ok(raw) => match parse_insight_response(&raw) {
                Some(insights) => insights,
                None => {
                    warn!("Gemini insight reply had no parseable JSON, using heuristic");
                    heuristic_insights(data)
                }
            },
            Err(e) => {
                warn!("Gemini insight call failed ({e}), using heuristic");
                heuristic_insights(data)
            }
        }
    }
}
