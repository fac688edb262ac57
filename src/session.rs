//! The question-answering session: current document, its context, and `ask`.
//!
//! A [`Session`] owns what used to be process-wide state. It holds at most one
//! document and at most one context, and the context is tagged with the
//! document it was built from: loading a new document drops the old context,
//! so a question can never be answered from a different PDF's text.
//!
//! The entry points here are shared by both front-ends:
//!
//! ```text
//! open_document ──▶ build_context ──▶ ask (repeatable)
//!  (rasterise)      (cached OCR)      (completion)
//! ```

use crate::completion::{Answer, Answerer};
use crate::config::PipelineConfig;
use crate::error::{PdfQaError, Result};
use crate::ocr::{OcrCredentials, OcrProvider};
use crate::pipeline::batch::{self, OcrPass};
use crate::pipeline::layout::{PageArtifacts, PageLayout};
use crate::pipeline::render::{self, PdfConverter};
use crate::progress::ProgressCallback;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A rasterised source PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name of the PDF; the document's identity.
    pub name: String,
    pub pdf_path: PathBuf,
    /// Page artifacts in page order.
    pub pages: Vec<PageArtifacts>,
}

/// The text questions are answered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContext {
    /// Document the text was built from; None when the pages were found in
    /// the output directory without a document being opened this session.
    pub document: Option<String>,
    /// Ordered concatenation of page texts, each followed by `\n`.
    pub text: String,
    pub page_count: usize,
}

impl DocumentContext {
    /// An empty string does not count as an established context.
    pub fn is_established(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Current document and context.
#[derive(Debug, Default)]
pub struct Session {
    document: Option<Document>,
    context: Option<Arc<DocumentContext>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Make `document` current. Any context built for a previous document is dropped.
    pub fn set_document(&mut self, document: Document) {
        if self.context.take().is_some() {
            info!("Dropping context of previous document; run OCR for '{}'", document.name);
        }
        self.document = Some(document);
    }

    /// Replace the context wholesale.
    pub fn replace_context(&mut self, context: DocumentContext) {
        self.context = Some(Arc::new(context));
    }

    /// A snapshot of the current context.
    pub fn context(&self) -> Option<Arc<DocumentContext>> {
        self.context.clone()
    }

    /// Pages to OCR: the current document's, else whatever the output directory holds.
    ///
    /// Fails with [`PdfQaError::NoPages`] when there is nothing to read.
    pub fn pages(&self, layout: &PageLayout) -> Result<Vec<PageArtifacts>> {
        let pages = match &self.document {
            Some(doc) => doc.pages.clone(),
            None => layout.scan()?,
        };
        if pages.is_empty() {
            return Err(PdfQaError::NoPages {
                dir: layout.dir().to_path_buf(),
            });
        }
        Ok(pages)
    }
}

/// Rasterise `pdf_path` into the configured output directory.
pub async fn open_document(
    converter: Arc<dyn PdfConverter>,
    config: &PipelineConfig,
    pdf_path: &Path,
) -> Result<Document> {
    let layout = PageLayout::new(&config.output_dir);
    let pages = render::rasterize(converter, pdf_path, &layout, config.raster_cache).await?;
    Ok(Document {
        name: render::document_name(pdf_path),
        pdf_path: pdf_path.to_path_buf(),
        pages,
    })
}

/// Authenticate with the OCR provider and run a cached OCR pass over `pages`.
///
/// The token is fetched on every call; it is never reused across passes.
pub async fn build_context(
    document: Option<&str>,
    pages: &[PageArtifacts],
    provider: &dyn OcrProvider,
    credentials: &OcrCredentials,
    progress: Option<&ProgressCallback>,
) -> Result<(DocumentContext, OcrPass)> {
    let recognizer = provider.authenticate(credentials).await?;
    let pass = batch::recognize_pages(pages, recognizer.as_ref(), progress).await?;

    let context = DocumentContext {
        document: document.map(str::to_string),
        text: pass.context.clone(),
        page_count: pass.pages,
    };
    Ok((context, pass))
}

/// Answer `question` from `context`.
///
/// Fails with a client error, without calling the provider, when the question
/// is blank or no context has been established.
pub async fn ask(
    answerer: &dyn Answerer,
    context: Option<&DocumentContext>,
    question: &str,
) -> Result<Answer> {
    if question.trim().is_empty() {
        return Err(PdfQaError::EmptyQuestion);
    }
    let context = context
        .filter(|c| c.is_established())
        .ok_or(PdfQaError::ContextNotEstablished)?;

    answerer.answer(question, &context.text).await
}
