//! Progress-callback trait for per-page OCR events.
//!
//! Pass an [`Arc<dyn OcrProgressCallback>`] to
//! [`crate::pipeline::batch::recognize_pages`] to receive events as the batch
//! walks the document. Every method has a no-op default, so an implementation
//! only overrides what it renders.
//!
//! # Example
//!
//! ```rust
//! use pdf_qa::OcrProgressCallback;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     recognized: Arc<AtomicUsize>,
//! }
//!
//! impl OcrProgressCallback for CountingCallback {
//!     fn on_page_recognized(&self, page: usize, total_pages: usize, text_len: usize) {
//!         self.recognized.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} recognised ({} bytes)", page, total_pages, text_len);
//!     }
//! }
//!
//! let cb: Arc<dyn OcrProgressCallback> = Arc::new(CountingCallback {
//!     recognized: Arc::new(AtomicUsize::new(0)),
//! });
//! cb.on_page_recognized(1, 3, 120);
//! ```

use std::sync::Arc;

/// Called by the batch OCR pass as it processes each page.
///
/// Pages are processed one at a time in page order, so events for a given
/// pass never interleave. Implementations are still `Send + Sync` because the
/// HTTP server runs passes on arbitrary runtime threads.
pub trait OcrProgressCallback: Send + Sync {
    /// Called once before the first page.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages in the pass
    fn on_batch_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is looked up in the cache.
    fn on_page_start(&self, page: usize, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Called when a page's text was read from its cache file.
    fn on_page_cached(&self, page: usize, total_pages: usize, text_len: usize) {
        let _ = (page, total_pages, text_len);
    }

    /// Called when a page was sent to the OCR provider and its text persisted.
    fn on_page_recognized(&self, page: usize, total_pages: usize, text_len: usize) {
        let _ = (page, total_pages, text_len);
    }

    /// Called once after the last page.
    ///
    /// # Arguments
    /// * `total_pages` — pages in the pass
    /// * `recognized`  — pages that needed a provider call
    fn on_batch_complete(&self, total_pages: usize, recognized: usize) {
        let _ = (total_pages, recognized);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl OcrProgressCallback for NoopProgressCallback {}

/// Shared handle type accepted by the batch pass.
pub type ProgressCallback = Arc<dyn OcrProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        cached: AtomicUsize,
        recognized: AtomicUsize,
        total: AtomicUsize,
    }

    impl OcrProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_pages: usize) {
            self.total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_start(&self, _page: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_cached(&self, _page: usize, _total_pages: usize, _text_len: usize) {
            self.cached.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_recognized(&self, _page: usize, _total_pages: usize, _text_len: usize) {
            self.recognized.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_page_start(1, 2);
        cb.on_page_cached(1, 2, 10);
        cb.on_page_recognized(2, 2, 20);
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_batch_start(3);
        tracker.on_page_start(1, 3);
        tracker.on_page_cached(1, 3, 5);
        tracker.on_page_start(2, 3);
        tracker.on_page_recognized(2, 3, 7);
        tracker.on_page_start(3, 3);
        tracker.on_page_recognized(3, 3, 9);

        assert_eq!(tracker.total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.cached.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.recognized.load(Ordering::SeqCst), 2);
    }
}
