//! HTTP API for uploading a PDF, running OCR and asking questions.
//!
//! # Endpoints
//!
//! - `POST /upload_pdf` - Store and rasterise a PDF (multipart field `pdf`)
//! - `POST /ocr` - Build the document context (form fields `baidu_api_key`, `baidu_secret_key`)
//! - `POST /ask` - Answer a question from the context (JSON `{"question": ...}`)
//! - `GET /health` - Health check
//!
//! # cURL Examples
//!
//! ```bash
//! curl -F "pdf=@pet-care.pdf" http://localhost:5000/upload_pdf
//! curl -d "baidu_api_key=$BAIDU_API_KEY" -d "baidu_secret_key=$BAIDU_SECRET_KEY" \
//!      http://localhost:5000/ocr
//! curl -H 'Content-Type: application/json' \
//!      -d '{"question":"What should I do if my dog stops eating?"}' \
//!      http://localhost:5000/ask
//! ```

mod error;
mod handlers;
mod types;

pub use error::ApiError;
pub use types::{
    ApiState, AskRequest, AskResponse, HealthResponse, OcrForm, OcrResponse, UploadResponse, DEFAULT_MAX_BODY_BYTES,
};

use crate::config::PipelineConfig;
use crate::error::{PdfQaError, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use handlers::{ask_handler, health_handler, ocr_handler, upload_pdf_handler};
use std::net::{IpAddr, SocketAddr};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Create the API router over `state`.
///
/// Public so the routes can be nested into a larger application.
pub fn create_router(state: ApiState) -> Router {
    // The browser front-end is served from another origin.
    let cors_layer = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/upload_pdf", post(upload_pdf_handler))
        .route("/ocr", post(ocr_handler))
        .route("/ask", post(ask_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(DEFAULT_MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(DEFAULT_MAX_BODY_BYTES))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server with the production backends.
///
/// ```no_run
/// use pdf_qa::{server::serve, PipelineConfig};
///
/// #[tokio::main]
/// async fn main() -> pdf_qa::Result<()> {
///     serve(PipelineConfig::default(), "127.0.0.1", 5000).await
/// }
/// ```
pub async fn serve(config: PipelineConfig, host: impl AsRef<str>, port: u16) -> Result<()> {
    let state = ApiState::from_config(config)?;
    serve_with_state(state, host, port).await
}

/// Start the API server over an already-built state.
pub async fn serve_with_state(state: ApiState, host: impl AsRef<str>, port: u16) -> Result<()> {
    let ip: IpAddr = host
        .as_ref()
        .parse()
        .map_err(|e| PdfQaError::InvalidConfig(format!("Invalid host address '{}': {e}", host.as_ref())))?;
    let addr = SocketAddr::new(ip, port);

    if state.config.completion.api_key.is_none() && state.config.completion.provider_name.is_none() {
        tracing::warn!("{} is not set; /ask will fail until it is", crate::config::COMPLETION_API_KEY_VAR);
    }

    let app = create_router(state);

    tracing::info!("Starting pdf-qa API server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| PdfQaError::Internal(format!("cannot bind {addr}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| PdfQaError::Internal(e.to_string()))?;

    Ok(())
}
