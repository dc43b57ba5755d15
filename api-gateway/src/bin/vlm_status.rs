//! VLM status Lambda - Handles /api/vlm/status.
//!
//! Probes both backends live (no caching) and returns the combined
//! availability view the dashboard renders.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::{
    error_response, json_response, ApiResponse, GeminiProvider, OllamaProvider, ScanOrchestrator,
    VlmConfig,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

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

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    if event.method().as_str() != "GET" {
        return error_response(405, "Method not allowed");
    }

    let report = state.orchestrator.status().await;
    json_response(200, &ApiResponse::success(report))
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
