//! API state and request/response bodies.

use crate::completion::{self, Answer, Answerer};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::ocr::{BaiduOcr, OcrCredentials, OcrProvider};
use crate::pipeline::render::{PdfConverter, PdfiumConverter};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default request body limit: 100 MB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// API server state.
///
/// The session is the only mutable part. Handlers take the write lock only to
/// swap in a new document or context, never across a provider call.
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<PipelineConfig>,
    pub converter: Arc<dyn PdfConverter>,
    pub ocr: Arc<dyn OcrProvider>,
    pub answerer: Arc<dyn Answerer>,
    pub session: Arc<RwLock<Session>>,
}

impl ApiState {
    pub fn new(
        config: PipelineConfig,
        converter: Arc<dyn PdfConverter>,
        ocr: Arc<dyn OcrProvider>,
        answerer: Arc<dyn Answerer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            converter,
            ocr,
            answerer,
            session: Arc::new(RwLock::new(Session::new())),
        }
    }

    /// Wire up the production backends: pdfium, Baidu OCR and the configured completion provider.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let converter = Arc::new(PdfiumConverter::new(&config));
        let ocr = Arc::new(BaiduOcr::from_config(&config)?);
        let answerer = completion::build_answerer(&config)?;
        Ok(Self::new(config, converter, ocr, answerer))
    }
}

/// Form body of `POST /ocr`. Missing fields arrive as empty strings and are
/// rejected by the token exchange.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OcrForm {
    #[serde(default)]
    pub baidu_api_key: String,
    #[serde(default)]
    pub baidu_secret_key: String,
}

impl From<OcrForm> for OcrCredentials {
    fn from(form: OcrForm) -> Self {
        OcrCredentials::new(form.baidu_api_key, form.baidu_secret_key)
    }
}

/// JSON body of `POST /ask`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub msg: String,
    /// Number of page images now in the output directory.
    pub pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResponse {
    pub msg: String,
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    /// True when the completion provider replied without a completion.
    pub degraded: bool,
}

impl From<Answer> for AskResponse {
    fn from(answer: Answer) -> Self {
        Self {
            degraded: answer.is_degraded(),
            answer: answer.into_text(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// True once an OCR pass has produced a context.
    pub context_ready: bool,
}
