//! # pdf-qa
//!
//! Ask natural-language questions about a PDF.
//!
//! ## Why this crate?
//!
//! Scanned manuals and leaflets carry no text layer, so text extraction tools
//! return nothing useful. This crate rasterises each page, runs it through a
//! remote OCR service once, caches the page text on disk, and answers
//! questions by sending the whole document text plus the question to a chat
//! completion model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input   store an upload or validate a local file
//!  ├─ 2. Render  rasterise pages to page_<N>.jpg via pdfium (spawn_blocking)
//!  ├─ 3. OCR     token exchange, then one recognition call per uncached page
//!  ├─ 4. Cache   page_<N>.txt next to each image; reruns only fill the gaps
//!  └─ 5. Ask     system persona + context + question → completion
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_qa::{session, BaiduOcr, OcrCredentials, PdfiumConverter, PipelineConfig};
//! use std::{path::Path, sync::Arc};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .completion_api_key(std::env::var("DEEPSEEK_API_KEY")?)
//!         .build()?;
//!
//!     let converter = Arc::new(PdfiumConverter::new(&config));
//!     let doc = session::open_document(converter, &config, Path::new("pet-care.pdf")).await?;
//!
//!     let ocr = BaiduOcr::from_config(&config)?;
//!     let creds = OcrCredentials::new(std::env::var("BAIDU_API_KEY")?, std::env::var("BAIDU_SECRET_KEY")?);
//!     let (context, _) = session::build_context(Some(doc.name.as_str()), &doc.pages, &ocr, &creds, None).await?;
//!
//!     let answerer = pdf_qa::completion::build_answerer(&config)?;
//!     let answer = session::ask(answerer.as_ref(), Some(&context), "How often should a puppy eat?").await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdfqa` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Enables the axum HTTP API in [`server`] |
//!
//! Disable both when using only the library:
//! ```toml
//! pdf-qa = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod completion;
pub mod config;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use completion::{Answer, Answerer, ChatCompletionClient, ProviderAnswerer};
pub use config::{CompletionSettings, OcrEndpoints, PipelineConfig, PipelineConfigBuilder, RasterCachePolicy};
pub use error::{PdfQaError, Result};
pub use ocr::{BaiduOcr, OcrCredentials, OcrProvider, TextRecognizer};
pub use pipeline::batch::OcrPass;
pub use pipeline::layout::{PageArtifacts, PageLayout};
pub use pipeline::render::{PdfConverter, PdfiumConverter};
pub use progress::{NoopProgressCallback, OcrProgressCallback, ProgressCallback};
pub use session::{Document, DocumentContext, Session};
