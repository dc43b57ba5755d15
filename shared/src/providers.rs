//! Provider capability contract and selection.
//!
//! The two backends are modeled as one trait with two concrete structs
//! ([`crate::ollama::OllamaProvider`], [`crate::gemini::GeminiProvider`]);
//! selection is a plain function over live availability, not a registry.

use async_trait::async_trait;

use crate::config::ProviderMode;
use crate::models::{
    BillScanResult, ExtractedBillData, InsightResponse, ProviderKind, ProviderStatus,
    VlmStatusReport,
};

/// Mime types accepted by the scan pipeline.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
    "application/pdf",
    "text/plain",
];

/// Maximum upload size accepted by the scan route.
pub const MAX_FILE_SIZE: usize = 15 * 1024 * 1024;

/// One bill document handed to an adapter.
///
/// Text bills travel as UTF-8; everything else as raw bytes plus the
/// declared mime type. Adapters base64-encode at the wire as their
/// protocol requires.
#[derive(Debug, Clone)]
pub enum ScanInput {
    Text(String),
    Binary { mime_type: String, data: Vec<u8> },
}

impl ScanInput {
    pub fn mime_type(&self) -> &str {
        match self {
            ScanInput::Text(_) => "text/plain",
            ScanInput::Binary { mime_type, .. } => mime_type,
        }
    }
}

/// Capability set every VLM backend implements.
///
/// None of these operations return `Err`: availability probes swallow
/// network failures, scans report failure as data, and insight
/// generation falls back to the deterministic heuristic.
#[async_trait]
pub trait VlmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Live availability probe. Never cached, never errors.
    async fn is_available(&self) -> bool;

    /// Probe with human-readable detail for the status endpoints.
    async fn status(&self) -> ProviderStatus;

    /// Scan one bill document. Failures come back as
    /// `BillScanResult { success: false, .. }` with at least one warning.
    async fn scan_bill(&self, input: &ScanInput) -> BillScanResult;

    /// Generate savings insights for extracted data. Falls back to the
    /// heuristic on any model failure, so it always returns something.
    async fn generate_insights(&self, data: &ExtractedBillData) -> InsightResponse;
}

/// Resolve the active provider for a scan.
///
/// Forced modes never fall back: an explicit choice that is unavailable
/// fails explicitly. Automatic prefers local (private and free), then
/// cloud, then none.
pub fn select_provider(
    mode: ProviderMode,
    local_available: bool,
    cloud_available: bool,
) -> Option<ProviderKind> {
    match mode {
        ProviderMode::Local => local_available.then_some(ProviderKind::Local),
        ProviderMode::Cloud => cloud_available.then_some(ProviderKind::Cloud),
        ProviderMode::Auto => {
            if local_available {
                Some(ProviderKind::Local)
            } else if cloud_available {
                Some(ProviderKind::Cloud)
            } else {
                None
            }
        }
    }
}

/// Probe both backends (including the one not selected) and report the
/// combined view for diagnostics. Not used on the scan path.
pub async fn status_report<L, C>(mode: ProviderMode, local: &L, cloud: &C) -> VlmStatusReport
where
    L: VlmProvider,
    C: VlmProvider,
{
    let local_status = local.status().await;
    let cloud_status = cloud.status().await;
    let active = select_provider(mode, local_status.available, cloud_status.available);

    VlmStatusReport {
        mode,
        local: local_status,
        cloud: cloud_status,
        active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_prefers_local() {
        assert_eq!(
            select_provider(ProviderMode::Auto, true, true),
            Some(ProviderKind::Local)
        );
    }

    #[test]
    fn test_auto_falls_back_to_cloud() {
        assert_eq!(
            select_provider(ProviderMode::Auto, false, true),
            Some(ProviderKind::Cloud)
        );
    }

    #[test]
    fn test_auto_none_when_nothing_available() {
        assert_eq!(select_provider(ProviderMode::Auto, false, false), None);
    }

    #[test]
    fn test_forced_local_never_promotes_to_cloud() {
        // Distinct from auto mode: the explicit choice must fail explicitly.
        assert_eq!(select_provider(ProviderMode::Local, false, true), None);
        assert_eq!(
            select_provider(ProviderMode::Local, true, false),
            Some(ProviderKind::Local)
        );
    }

    #[test]
    fn test_forced_cloud_is_symmetric() {
        assert_eq!(select_provider(ProviderMode::Cloud, true, false), None);
        assert_eq!(
            select_provider(ProviderMode::Cloud, false, true),
            Some(ProviderKind::Cloud)
        );
    }

    #[test]
    fn test_scan_input_mime_type() {
        assert_eq!(ScanInput::Text("x".into()).mime_type(), "text/plain");
        let binary = ScanInput::Binary {
            mime_type: "image/png".into(),
            data: vec![1, 2, 3],
        };
        assert_eq!(binary.mime_type(), "image/png");
    }
}
