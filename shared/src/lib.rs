//! Shared library for the bill-scanning Lambda functions.
//!
//! This crate holds the VLM provider adapters, the provider selection
//! and fallback orchestration, and the schema contracts the HTTP layer
//! serializes.

pub mod config;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod http;
pub mod insights;
pub mod models;
pub mod ollama;
pub mod prompt;
pub mod providers;
pub mod retry;
pub mod scan;

pub use config::{ProviderMode, VlmConfig};
pub use error::{Error, Result};
pub use gemini::GeminiProvider;
pub use http::{error_response, json_response, ApiResponse};
pub use models::{
    BillScanResult, ExtractedBillData, InsightResponse, LineItem, ProviderKind, ProviderStatus,
    RiskLevel, ScanResponse, VlmStatusReport,
};
pub use ollama::OllamaProvider;
pub use providers::{ScanInput, VlmProvider, MAX_FILE_SIZE, SUPPORTED_MIME_TYPES};
pub use retry::{with_default_retry, with_retry};
pub use scan::ScanOrchestrator;
