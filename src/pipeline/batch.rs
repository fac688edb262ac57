//! Batch OCR over a document's pages with a per-page text cache.
//!
//! For each page, in page order: reuse `page_<N>.txt` if it exists, otherwise
//! recognise `page_<N>.jpg`, persist the text, and use the fresh result. Each
//! page's text plus `\n` is appended to the context. The order is load-bearing:
//! it is the order the question-answering prompt presents the document in.
//!
//! A rerun after a partial pass only recognises the missing pages and
//! produces the same context as a from-scratch run.

use crate::error::{PdfQaError, Result};
use crate::ocr::TextRecognizer;
use crate::pipeline::layout::PageArtifacts;
use crate::progress::ProgressCallback;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Outcome of one batch OCR pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrPass {
    /// Ordered concatenation of every page text, each followed by `\n`.
    pub context: String,
    /// Pages in the pass.
    pub pages: usize,
    /// Pages that required a provider call.
    pub recognized: usize,
    /// Pages served from their cached text file.
    pub reused: usize,
    pub duration_ms: u64,
}

/// Run OCR over `pages`, strictly one page at a time in the given order.
pub async fn recognize_pages(
    pages: &[PageArtifacts],
    recognizer: &dyn TextRecognizer,
    progress: Option<&ProgressCallback>,
) -> Result<OcrPass> {
    let start = Instant::now();
    let total = pages.len();
    info!("Starting OCR pass over {} pages", total);

    if let Some(cb) = progress {
        cb.on_batch_start(total);
    }

    let mut context = String::new();
    let mut recognized = 0;

    for page in pages {
        if let Some(cb) = progress {
            cb.on_page_start(page.index, total);
        }

        let page_text = match read_cached_text(&page.text).await? {
            Some(text) => {
                debug!("Page {}: using cached text", page.index);
                if let Some(cb) = progress {
                    cb.on_page_cached(page.index, total, text.len());
                }
                text
            }
            None => {
                let text = recognizer.recognize(&page.image).await?;
                write_text_atomically(&page.text, &text).await?;
                recognized += 1;
                debug!("Page {}: recognised {} chars", page.index, text.len());
                if let Some(cb) = progress {
                    cb.on_page_recognized(page.index, total, text.len());
                }
                text
            }
        };

        context.push_str(&page_text);
        context.push('\n');
    }

    if let Some(cb) = progress {
        cb.on_batch_complete(total, recognized);
    }

    let pass = OcrPass {
        context,
        pages: total,
        recognized,
        reused: total - recognized,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "OCR pass complete: {} pages ({} recognised, {} cached) in {}ms",
        pass.pages, pass.recognized, pass.reused, pass.duration_ms
    );
    Ok(pass)
}

async fn read_cached_text(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PdfQaError::cache_io(path, e)),
    }
}

/// Write via a uniquely named sibling temp file and rename, so a cache file is
/// either complete or absent. Overlapping passes may persist the same page;
/// the last rename wins and both texts are complete.
async fn write_text_atomically(path: &Path, text: &str) -> Result<()> {
    let path = path.to_path_buf();
    let text = text.to_owned();
    tokio::task::spawn_blocking(move || persist_text(&path, &text))
        .await
        .map_err(|e| PdfQaError::Internal(format!("Cache write task panicked: {e}")))?
}

fn persist_text(path: &Path, text: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| PdfQaError::cache_io(dir, e))?;
    tmp.write_all(text.as_bytes())
        .map_err(|e| PdfQaError::cache_io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| PdfQaError::cache_io(path, e.error))?;
    Ok(())
}
