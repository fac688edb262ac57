//! Configuration types for the PDF question-answering pipeline.
//!
//! Every knob lives in [`PipelineConfig`], built through
//! [`PipelineConfigBuilder`]. The HTTP server and the interactive CLI both
//! start from the same struct, so a directory layout or endpoint override
//! behaves identically in either front-end.
//!
//! Credentials for the OCR provider are *not* part of the configuration: they
//! are supplied per OCR pass (see [`crate::ocr::OcrCredentials`]). The
//! completion API key is, because the HTTP variant reads it once from the
//! environment at startup.

use crate::error::PdfQaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Baidu OAuth token endpoint (client-credentials grant).
pub const DEFAULT_TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";

/// Baidu general-purpose text recognition endpoint.
pub const DEFAULT_RECOGNIZE_URL: &str = "https://aip.baidubce.com/rest/2.0/ocr/v1/general_basic";

/// DeepSeek chat-completions endpoint.
pub const DEFAULT_COMPLETION_URL: &str = "https://api.deepseek.com/v1/chat/completions";

/// Model used with [`DEFAULT_COMPLETION_URL`].
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Environment variable holding the completion API key.
pub const COMPLETION_API_KEY_VAR: &str = "DEEPSEEK_API_KEY";

/// Configuration for the whole pipeline.
///
/// # Example
/// ```rust
/// use pdf_qa::{PipelineConfig, RasterCachePolicy};
///
/// let config = PipelineConfig::builder()
///     .output_dir("cache/pages")
///     .raster_cache(RasterCachePolicy::Verify)
///     .completion_api_key("sk-test")
///     .build()
///     .unwrap();
/// assert_eq!(config.output_dir.to_str(), Some("cache/pages"));
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Directory receiving uploaded PDFs. Default: `uploads`.
    pub uploads_dir: PathBuf,

    /// Directory holding `page_<N>.jpg` images and their `page_<N>.txt` OCR
    /// cache. Default: `output_images`.
    pub output_dir: PathBuf,

    /// How an already-populated output directory is treated. Default: [`RasterCachePolicy::Trust`].
    pub raster_cache: RasterCachePolicy,

    /// Longest edge of a rendered page in pixels. Default: 2000.
    ///
    /// The OCR provider rejects images above roughly 4096 px per side and
    /// 4 MB after base64, so pages are capped well below that.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub pdf_password: Option<String>,

    /// Directory containing the pdfium shared library. If None, the current
    /// directory and then the system loader path are tried.
    pub pdfium_library_path: Option<PathBuf>,

    /// OCR provider endpoints.
    pub ocr: OcrEndpoints,

    /// Completion provider settings.
    pub completion: CompletionSettings,

    /// Per-request timeout for provider calls, in seconds. Default: None (wait
    /// as long as the provider takes).
    pub request_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("output_images"),
            raster_cache: RasterCachePolicy::default(),
            max_rendered_pixels: 2000,
            pdf_password: None,
            pdfium_library_path: None,
            ocr: OcrEndpoints::default(),
            completion: CompletionSettings::default(),
            request_timeout_secs: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("uploads_dir", &self.uploads_dir)
            .field("output_dir", &self.output_dir)
            .field("raster_cache", &self.raster_cache)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("pdf_password", &self.pdf_password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("ocr", &self.ocr)
            .field("completion", &self.completion)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a `reqwest` client honouring [`Self::request_timeout_secs`].
    pub fn http_client(&self) -> Result<reqwest::Client, PdfQaError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        builder
            .build()
            .map_err(|e| PdfQaError::Internal(format!("Failed to build HTTP client: {e}")))
    }
}

/// OCR provider endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrEndpoints {
    pub token_url: String,
    pub recognize_url: String,
}

impl Default for OcrEndpoints {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            recognize_url: DEFAULT_RECOGNIZE_URL.to_string(),
        }
    }
}

/// Settings for the question-answering completion call.
#[derive(Clone)]
pub struct CompletionSettings {
    /// Chat-completions endpoint URL.
    pub endpoint: String,

    /// Model identifier sent with each request. Default: `deepseek-chat`.
    pub model: String,

    /// Bearer token for the endpoint.
    pub api_key: Option<String>,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Sampling temperature. If None, the provider default applies.
    pub temperature: Option<f32>,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    ///
    /// When set, answers go through that provider with [`Self::model`] instead
    /// of the direct chat-completions client.
    pub provider_name: Option<String>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPLETION_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            system_prompt: None,
            temperature: None,
            provider_name: None,
        }
    }
}

impl fmt::Debug for CompletionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSettings")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("temperature", &self.temperature)
            .field("provider_name", &self.provider_name)
            .finish()
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn uploads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.uploads_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn raster_cache(mut self, policy: RasterCachePolicy) -> Self {
        self.config.raster_cache = policy;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdf_password(mut self, pwd: impl Into<String>) -> Self {
        self.config.pdf_password = Some(pwd.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn ocr_endpoints(mut self, token_url: impl Into<String>, recognize_url: impl Into<String>) -> Self {
        self.config.ocr = OcrEndpoints {
            token_url: token_url.into(),
            recognize_url: recognize_url.into(),
        };
        self
    }

    pub fn completion_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.completion.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.completion.model = model.into();
        self
    }

    pub fn completion_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.completion.api_key = Some(key.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.completion.system_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.completion.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.completion.provider_name = Some(name.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PdfQaError> {
        let c = &self.config;
        if c.uploads_dir.as_os_str().is_empty() || c.output_dir.as_os_str().is_empty() {
            return Err(PdfQaError::InvalidConfig(
                "uploads and output directories must not be empty".into(),
            ));
        }
        if c.uploads_dir == c.output_dir {
            return Err(PdfQaError::InvalidConfig(format!(
                "uploads and output directories must differ, both are '{}'",
                c.output_dir.display()
            )));
        }
        if c.completion.endpoint.trim().is_empty() {
            return Err(PdfQaError::InvalidConfig("completion endpoint is empty".into()));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(PdfQaError::InvalidConfig(
                "request timeout must be at least 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the rasteriser treats an output directory that already holds page images.
///
/// | Policy | Behaviour |
/// |--------|-----------|
/// | `Trust` | Any existing `page_<N>.jpg` files are returned as-is; the PDF is not opened |
/// | `Verify` | Existing images are reused only if `document.json` records the same PDF SHA-256; otherwise they are purged and the PDF is re-rasterised |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RasterCachePolicy {
    /// Reuse whatever page images exist. (default)
    #[default]
    Trust,
    /// Reuse page images only when they were produced from the same PDF bytes.
    Verify,
}
