//! Shared data models for bill scanning.

use serde::{Deserialize, Serialize};

/// Which VLM backend produced a result or status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Self-hosted model server (Ollama wire protocol).
    Local,
    /// Hosted VLM API (Gemini).
    Cloud,
}

/// A single charge line on a bill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: f64,
}

/// Structured fields extracted from a bill document.
///
/// Always fully populated: numeric fields default to 0, string fields to
/// the empty string, lists to empty. Callers never see partial data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedBillData {
    pub consumer_number: String,
    pub meter_number: String,
    pub bill_date: String,
    pub due_date: String,
    /// Free-form period string as printed on the bill (e.g. "Jan - Feb 2024").
    pub billing_period: String,
    pub units_consumed: f64,
    pub previous_reading: f64,
    pub current_reading: f64,
    pub max_demand: f64,
    /// Nominally in [0, 1]; 0 when the bill does not state it.
    pub power_factor: f64,
    pub sanctioned_load: f64,
    pub contract_demand: f64,
    pub utility_provider: String,
    pub tariff_category: String,
    pub address: String,
    pub total_amount: f64,
    pub line_items: Vec<LineItem>,
}

/// Coarse severity judgment for a bill's inefficiency signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// AI- or heuristic-generated savings analysis for one bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightResponse {
    pub summary: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub potential_savings: f64,
    pub risk_level: RiskLevel,
}

/// Outer envelope for one scan request.
///
/// Constructed once per scan and immutable afterwards; the HTTP layer
/// serializes it and decides what subset to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillScanResult {
    pub success: bool,
    pub extracted_data: Option<ExtractedBillData>,
    pub insights: Option<InsightResponse>,
    /// Model-reported reliability estimate in [0, 1].
    pub confidence: f64,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
}

impl BillScanResult {
    /// A failed scan with the given warning and no extracted data.
    pub fn failure(warning: impl Into<String>) -> Self {
        Self {
            success: false,
            extracted_data: None,
            insights: None,
            confidence: 0.0,
            warnings: vec![warning.into()],
            raw_text: None,
            provider: None,
        }
    }

    /// Tag the result with the backend that produced it.
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }
}

/// Live availability of one backend. Never cached; recomputed per probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub provider: ProviderKind,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload returned by `POST /api/bills/scan` on success.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub extracted_data: Option<ExtractedBillData>,
    pub insights: Option<InsightResponse>,
    pub confidence: f64,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
    pub file_type: String,
}

impl ScanResponse {
    pub fn from_result(result: BillScanResult, file_type: impl Into<String>) -> Self {
        Self {
            extracted_data: result.extracted_data,
            insights: result.insights,
            confidence: result.confidence,
            warnings: result.warnings,
            provider: result.provider,
            file_type: file_type.into(),
        }
    }
}

/// Combined diagnostic view over both backends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VlmStatusReport {
    pub mode: crate::config::ProviderMode,
    pub local: ProviderStatus,
    pub cloud: ProviderStatus,
    pub active: Option<ProviderKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::Cloud).unwrap(),
            r#""cloud""#
        );
        assert_eq!(
            serde_json::to_string(&ProviderKind::Local).unwrap(),
            r#""local""#
        );
    }

    #[test]
    fn test_risk_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), r#""medium""#);
    }

    #[test]
    fn test_failure_result_always_has_warning() {
        let result = BillScanResult::failure("backend down");
        assert!(!result.success);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.warnings, vec!["backend down"]);
    }

    #[test]
    fn test_scan_result_camel_case_wire_format() {
        let result = BillScanResult {
            success: true,
            extracted_data: Some(ExtractedBillData::default()),
            insights: None,
            confidence: 0.9,
            warnings: vec![],
            raw_text: None,
            provider: Some(ProviderKind::Local),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["extractedData"]["totalAmount"], 0.0);
        assert_eq!(json["provider"], "local");
    }
}
