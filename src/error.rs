//! Error types for the pdf-qa library.
//!
//! A single fatal error type, [`PdfQaError`], covers every stage of the
//! pipeline: input validation, rasterisation, the page-text cache, the OCR
//! provider, the completion provider and the question-answering session.
//!
//! One failure mode is deliberately *not* an error: a completion provider that
//! answers with something other than a completion. That case is modelled as
//! [`crate::completion::Answer::Degraded`] so the end user always gets an
//! answer string.
//!
//! [`PdfQaError::is_client_error`] separates problems the caller can fix
//! (empty question, no context yet, bad upload) from provider and I/O
//! failures; the HTTP layer maps the former to `400` and the latter to `500`.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PdfQaError>;

/// All fatal errors returned by the pdf-qa library.
#[derive(Debug, Error)]
pub enum PdfQaError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// An upload request carried no usable file.
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --pdf-password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium failed to render a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH to the directory containing libpdfium, or install\n\
pdfium system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Cache errors ──────────────────────────────────────────────────────
    /// Reading or writing a page image, page text or manifest failed.
    #[error("Cache I/O failed for '{path}': {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rasterised page could not be written as JPEG.
    #[error("Failed to write page image '{path}': {detail}")]
    ImageWriteFailed { path: PathBuf, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// API key or secret missing from the OCR request.
    #[error("OCR credentials missing: {0}")]
    MissingCredentials(String),

    /// The token endpoint could not be reached or returned garbage.
    #[error("OCR token exchange failed: {reason}")]
    TokenExchangeFailed { reason: String },

    /// The token endpoint answered but issued no access token.
    #[error("OCR provider issued no access token: {detail}")]
    TokenMissing { detail: String },

    /// The recognition call for one page failed outright.
    #[error("OCR failed for '{path}': {reason}")]
    RecognitionFailed { path: PathBuf, reason: String },

    // ── Completion errors ─────────────────────────────────────────────────
    /// No API key configured for the completion provider.
    #[error("Completion API key is not set.\nExport {var} or pass it on the command line.")]
    MissingApiKey { var: &'static str },

    /// The completion endpoint could not be reached.
    #[error("Completion request failed: {reason}")]
    CompletionFailed { reason: String },

    /// The configured edgequake-llm provider could not be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// The question was empty or whitespace only.
    #[error("Please provide a non-empty question.")]
    EmptyQuestion,

    /// A question was asked before any OCR pass produced a context.
    #[error("No document context yet: upload a PDF and run OCR first.")]
    ContextNotEstablished,

    /// OCR was triggered but there are no page images to read.
    #[error("No page images found in '{dir}': upload a PDF first.")]
    NoPages { dir: PathBuf },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfQaError {
    /// Wrap an I/O error with the path it concerns.
    pub fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PdfQaError::CacheIo {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by the request rather than by a provider or the
    /// local environment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PdfQaError::EmptyQuestion
                | PdfQaError::ContextNotEstablished
                | PdfQaError::InvalidUpload(_)
                | PdfQaError::NotAPdf { .. }
                | PdfQaError::NoPages { .. }
        )
    }
}
