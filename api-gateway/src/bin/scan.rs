//! Scan Lambda - Handles /api/bills/scan.
//!
//! POST accepts a multipart upload (field `file`), runs it through the
//! VLM fallback orchestrator, and returns the scan envelope. GET reports
//! provider availability plus the supported upload formats.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Serialize;
use shared::{
    error_response, json_response, ApiResponse, GeminiProvider, OllamaProvider, ScanInput,
    ScanOrchestrator, ScanResponse, VlmConfig, VlmStatusReport, MAX_FILE_SIZE,
    SUPPORTED_MIME_TYPES,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state shared across requests.
struct AppState {
    orchestrator: ScanOrchestrator<OllamaProvider, GeminiProvider>,
}

impl AppState {
    fn new() -> Result<Self, Error> {
        let config = VlmConfig::from_env();
        let local = OllamaProvider::new(&config)?;
        let cloud = GeminiProvider::new(&config);

        Ok(Self {
            orchestrator: ScanOrchestrator::new(config.mode, config.ollama_model, local, cloud),
        })
    }
}

/// Static description of what the scan endpoint accepts.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanInfo {
    status: VlmStatusReport,
    supported_formats: &'static [&'static str],
    max_file_size_bytes: usize,
}

/// One uploaded file pulled out of the multipart body.
struct Upload {
    mime_type: String,
    data: Vec<u8>,
}

async fn parse_upload(event: &Request) -> Result<Upload, String> {
    let content_type = event
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .ok_or("Missing content-type header")?;

    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| "Expected a multipart/form-data upload")?;

    let body = event.body().as_ref().to_vec();
    let stream = futures::stream::once(async move { Ok::<_, std::convert::Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Invalid multipart body: {e}"))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let mime_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| format!("Failed to read upload: {e}"))?
            .to_vec();

        return Ok(Upload { mime_type, data });
    }

    Err("Missing `file` field in upload".to_string())
}

async fn handle_post(state: &AppState, event: &Request) -> Result<Response<Body>, Error> {
    let upload = match parse_upload(event).await {
        Ok(upload) => upload,
        Err(message) => return error_response(400, message),
    };

    if upload.data.len() > MAX_FILE_SIZE {
        return error_response(400, "File is too large (maximum 15 MB)");
    }
    if !SUPPORTED_MIME_TYPES.contains(&upload.mime_type.as_str()) {
        return error_response(
            400,
            format!(
                "Unsupported file type '{}'. Supported: {}",
                upload.mime_type,
                SUPPORTED_MIME_TYPES.join(", ")
            ),
        );
    }

    info!(mime = %upload.mime_type, bytes = upload.data.len(), "Scanning uploaded bill");

    let input = if upload.mime_type == "text/plain" {
        ScanInput::Text(String::from_utf8_lossy(&upload.data).into_owned())
    } else {
        ScanInput::Binary {
            mime_type: upload.mime_type.clone(),
            data: upload.data,
        }
    };

    let result = state.orchestrator.scan_with_fallback(&input).await;

    if result.success {
        let response = ApiResponse::success(ScanResponse::from_result(result, upload.mime_type));
        json_response(200, &response)
    } else {
        error!(warnings = ?result.warnings, "Bill scan failed");
        let response = ApiResponse::<()>::error_with_warnings("Bill scan failed", result.warnings);
        json_response(400, &response)
    }
}

async fn handle_get(state: &AppState) -> Result<Response<Body>, Error> {
    let info = ScanInfo {
        status: state.orchestrator.status().await,
        supported_formats: SUPPORTED_MIME_TYPES,
        max_file_size_bytes: MAX_FILE_SIZE,
    };
    json_response(200, &ApiResponse::success(info))
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    match event.method().as_str() {
        "POST" => handle_post(&state, &event).await,
        "GET" => handle_get(&state).await,
        _ => error_response(405, "Method not allowed"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new()?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
