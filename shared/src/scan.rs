//! Fallback orchestration across VLM backends.
//!
//! Single entry point for the HTTP layer: resolve the active provider,
//! scan, fall back local→cloud when that makes sense, and make sure the
//! warnings that come back are actionable for whichever backend
//! ultimately failed. Never returns an error; failure is data.

use tracing::{info, warn};

use crate::config::ProviderMode;
use crate::models::{BillScanResult, ProviderKind, VlmStatusReport};
use crate::providers::{select_provider, status_report, ScanInput, VlmProvider};

/// Shown when neither backend can take the scan.
const NO_PROVIDER_WARNING: &str = "No AI service is available. Start the Ollama server \
     (`ollama serve`) or set GEMINI_API_KEY to enable cloud scanning.";

/// Rewrite a raw local-backend warning into remediation guidance.
///
/// Substring classification, first match wins. Unrecognized messages
/// pass through with a prefix naming the backend that failed.
pub fn rewrite_local_warning(warning: &str, model: &str) -> String {
    let lower = warning.to_lowercase();

    if ["resource limitations", "unexpectedly stopped", "out of memory"]
        .iter()
        .any(|phrase| lower.contains(phrase))
    {
        return format!(
            "The local model ran out of resources. Free up memory or switch to a \
             lighter model than '{model}'."
        );
    }
    if ["connection refused", "failed to connect", "error sending request", "not reachable"]
        .iter()
        .any(|phrase| lower.contains(phrase))
    {
        return "Could not reach the Ollama server. Ensure the service is running \
                (`ollama serve`) and OLLAMA_BASE_URL points at it."
            .to_string();
    }
    if lower.contains("not installed") || (lower.contains("model") && lower.contains("not found")) {
        return format!("Model '{model}' is missing. Install it with `ollama pull {model}`.");
    }
    if lower.contains("timed out") {
        return "The local scan timed out. Try a smaller image or a lighter model.".to_string();
    }

    if lower.starts_with("ollama") {
        warning.to_string()
    } else {
        format!("Ollama: {warning}")
    }
}

/// Orchestrates scans across the local and cloud adapters.
///
/// Generic over the provider trait so the fallback policy is testable
/// with mock backends; production wiring uses
/// [`crate::ollama::OllamaProvider`] and [`crate::gemini::GeminiProvider`].
pub struct ScanOrchestrator<L, C> {
    mode: ProviderMode,
    local_model: String,
    local: L,
    cloud: C,
}

impl<L, C> ScanOrchestrator<L, C>
where
    L: VlmProvider,
    C: VlmProvider,
{
    pub fn new(mode: ProviderMode, local_model: impl Into<String>, local: L, cloud: C) -> Self {
        Self {
            mode,
            local_model: local_model.into(),
            local,
            cloud,
        }
    }

    /// Scan one bill, falling back from local to cloud on failure.
    ///
    /// The fallback is one-directional: a failed cloud scan has no
    /// second cloud-like backend to go to. When both sides fail, the
    /// original local failure is returned with its warnings rewritten
    /// into local remediation guidance.
    pub async fn scan_with_fallback(&self, input: &ScanInput) -> BillScanResult {
        let local_available = self.local.is_available().await;
        let cloud_available = self.cloud.is_available().await;

        let Some(active) = select_provider(self.mode, local_available, cloud_available) else {
            warn!(mode = ?self.mode, "No VLM provider available for scan");
            return BillScanResult::failure(NO_PROVIDER_WARNING);
        };

        info!(provider = ?active, mime = input.mime_type(), "Scanning bill");

        match active {
            ProviderKind::Cloud => self.cloud.scan_bill(input).await,
            ProviderKind::Local => {
                let local_result = self.local.scan_bill(input).await;
                if local_result.success {
                    return local_result;
                }

                if cloud_available {
                    info!("Local scan failed, retrying on cloud provider");
                    let cloud_result = self.cloud.scan_bill(input).await;
                    if cloud_result.success {
                        return cloud_result;
                    }
                    warn!("Cloud fallback also failed, returning local failure");
                }

                self.rewrite_warnings(local_result)
            }
        }
    }

    /// Combined status over both backends, for the diagnostics routes.
    pub async fn status(&self) -> VlmStatusReport {
        status_report(self.mode, &self.local, &self.cloud).await
    }

    fn rewrite_warnings(&self, mut result: BillScanResult) -> BillScanResult {
        result.warnings = result
            .warnings
            .iter()
            .map(|w| rewrite_local_warning(w, &self.local_model))
            .collect();
        result
    }
}
