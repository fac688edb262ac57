//! Pipeline stages from PDF to document context.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ layout ──▶ encode ──▶ OCR ──▶ batch
//! (upload)  (pdfium)   (page_N)   (base64)  (remote) (cache + concat)
//! ```
//!
//! 1. [`input`]  — validate a local PDF or store an uploaded one
//! 2. [`render`] — rasterise pages to `page_<N>.jpg`, once per document
//! 3. [`layout`] — map page indices to image/text cache paths
//! 4. [`encode`] — base64-wrap a page image for the OCR request body
//! 5. [`batch`]  — walk the pages in order, reusing cached texts and
//!    recognising the rest, and build the context string

pub mod batch;
pub mod encode;
pub mod input;
pub mod layout;
pub mod render;
