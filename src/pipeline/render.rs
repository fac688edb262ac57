//! PDF rasterisation: turn a PDF into `page_<N>.jpg` files, once per document.
//!
//! [`rasterize`] owns the caching rules; the actual page rendering sits
//! behind the [`PdfConverter`] trait so the pdfium binding can be swapped out.
//!
//! ## Cache short-circuit
//!
//! If the output directory already contains page images, they are returned
//! without opening the PDF. Under [`RasterCachePolicy::Trust`] that happens
//! unconditionally. Under [`RasterCachePolicy::Verify`] the images are reused
//! only when `document.json` records the same SHA-256 as the requested PDF;
//! otherwise the stale images *and their cached texts* are purged first.
//!
//! ## Why spawn_blocking?
//!
//! pdfium uses thread-local state and is not safe to call from async
//! contexts. Conversion and JPEG encoding run on the blocking pool.

use crate::config::{PipelineConfig, RasterCachePolicy};
use crate::error::{PdfQaError, Result};
use crate::pipeline::input;
use crate::pipeline::layout::{PageArtifacts, PageLayout, RasterManifest};
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Renders every page of a PDF to an image, in page order.
pub trait PdfConverter: Send + Sync {
    fn convert(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>>;
}

/// [`PdfConverter`] backed by the pdfium library.
#[derive(Debug, Clone)]
pub struct PdfiumConverter {
    max_rendered_pixels: u32,
    password: Option<String>,
    library_path: Option<PathBuf>,
}

impl PdfiumConverter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            max_rendered_pixels: config.max_rendered_pixels,
            password: config.pdf_password.clone(),
            library_path: config.pdfium_library_path.clone(),
        }
    }

    fn bind(&self) -> Result<Pdfium> {
        let bindings = match &self.library_path {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| PdfQaError::PdfiumBindingFailed(format!("{e:?}")))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PdfConverter for PdfiumConverter {
    fn convert(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>> {
        let pdfium = self.bind()?;
        let password = self.password.as_deref();

        let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    PdfQaError::WrongPassword {
                        path: pdf_path.to_path_buf(),
                    }
                } else {
                    PdfQaError::PasswordRequired {
                        path: pdf_path.to_path_buf(),
                    }
                }
            } else {
                PdfQaError::CorruptPdf {
                    path: pdf_path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_rendered_pixels as i32)
            .set_maximum_height(self.max_rendered_pixels as i32);

        let mut images = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                PdfQaError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;
            let image = bitmap.as_image();
            debug!("Rendered page {} → {}x{} px", idx + 1, image.width(), image.height());
            images.push(image);
        }

        Ok(images)
    }
}

/// Rasterise `pdf_path` into `layout`, reusing existing page images per `policy`.
///
/// Returns the page artifacts in page order.
pub async fn rasterize(
    converter: Arc<dyn PdfConverter>,
    pdf_path: &Path,
    layout: &PageLayout,
    policy: RasterCachePolicy,
) -> Result<Vec<PageArtifacts>> {
    let path = pdf_path.to_path_buf();
    let layout = layout.clone();

    tokio::task::spawn_blocking(move || rasterize_blocking(converter.as_ref(), &path, &layout, policy))
        .await
        .map_err(|e| PdfQaError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of [`rasterize`].
pub fn rasterize_blocking(
    converter: &dyn PdfConverter,
    pdf_path: &Path,
    layout: &PageLayout,
    policy: RasterCachePolicy,
) -> Result<Vec<PageArtifacts>> {
    std::fs::create_dir_all(layout.dir()).map_err(|e| PdfQaError::cache_io(layout.dir(), e))?;

    let cached = layout.scan()?;
    let mut fingerprint = None;

    if !cached.is_empty() {
        match policy {
            RasterCachePolicy::Trust => {
                info!(
                    "Reusing {} cached page images in {}",
                    cached.len(),
                    layout.dir().display()
                );
                return Ok(cached);
            }
            RasterCachePolicy::Verify => {
                input::validate_pdf(pdf_path)?;
                let digest = input::fingerprint(pdf_path)?;
                let matches = layout
                    .read_manifest()
                    .is_some_and(|m| m.sha256 == digest && m.pages == cached.len());
                if matches {
                    info!("Reusing {} verified page images", cached.len());
                    return Ok(cached);
                }
                warn!(
                    "Cached page images in {} belong to another document; re-rasterising",
                    layout.dir().display()
                );
                layout.purge(&cached)?;
                fingerprint = Some(digest);
            }
        }
    }

    input::validate_pdf(pdf_path)?;
    let images = converter.convert(pdf_path)?;

    let mut pages = Vec::with_capacity(images.len());
    for (i, image) in images.into_iter().enumerate() {
        let page = layout.page(i + 1);
        write_jpeg(image, &page.image)?;
        pages.push(page);
    }

    let sha256 = match fingerprint {
        Some(digest) => digest,
        None => input::fingerprint(pdf_path)?,
    };
    layout.write_manifest(&RasterManifest {
        document: document_name(pdf_path),
        sha256,
        pages: pages.len(),
    })?;

    info!("Rasterised {} pages into {}", pages.len(), layout.dir().display());
    Ok(pages)
}

/// File name of a PDF path, used as the document's identity in logs and the manifest.
pub fn document_name(pdf_path: &Path) -> String {
    pdf_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| pdf_path.display().to_string())
}

fn write_jpeg(image: DynamicImage, path: &Path) -> Result<()> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    rgb.save_with_format(path, ImageFormat::Jpeg)
        .map_err(|e| PdfQaError::ImageWriteFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingConverter {
        pages: usize,
        calls: AtomicUsize,
    }

    impl CountingConverter {
        fn new(pages: usize) -> Self {
            Self {
                pages,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PdfConverter for CountingConverter {
        fn convert(&self, _pdf_path: &Path) -> Result<Vec<DynamicImage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..self.pages)
                .map(|i| {
                    DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([i as u8, 0, 0, 255])))
                })
                .collect())
        }
    }

    fn write_pdf(dir: &Path, name: &str, body: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.extend_from_slice(body);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn fresh_directory_is_converted_once() {
        let dir = TempDir::new().unwrap();
        let pdf = write_pdf(dir.path(), "guide.pdf", b"a");
        let layout = PageLayout::new(dir.path().join("out"));
        let converter = CountingConverter::new(3);

        let pages = rasterize_blocking(&converter, &pdf, &layout, RasterCachePolicy::Trust).unwrap();

        assert_eq!(converter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pages.iter().map(|p| p.index).collect::<Vec<_>>(), vec![1, 2, 3]);
        for page in &pages {
            let decoded = image::open(&page.image).unwrap();
            assert_eq!(decoded.width(), 8);
        }
        let manifest = layout.read_manifest().unwrap();
        assert_eq!(manifest.document, "guide.pdf");
        assert_eq!(manifest.pages, 3);
    }

    #[test]
    fn trust_policy_reuses_images_without_converting() {
        let dir = TempDir::new().unwrap();
        let layout = PageLayout::new(dir.path().join("out"));
        std::fs::create_dir_all(layout.dir()).unwrap();
        for i in 1..=2 {
            std::fs::write(layout.page(i).image, b"not really a jpeg").unwrap();
        }
        // The PDF does not even exist: the short-circuit never opens it.
        let converter = CountingConverter::new(5);
        let pages = rasterize_blocking(
            &converter,
            &dir.path().join("other.pdf"),
            &layout,
            RasterCachePolicy::Trust,
        )
        .unwrap();

        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(pages, vec![layout.page(1), layout.page(2)]);
    }

    #[test]
    fn verify_policy_reuses_images_of_same_document() {
        let dir = TempDir::new().unwrap();
        let pdf = write_pdf(dir.path(), "guide.pdf", b"a");
        let layout = PageLayout::new(dir.path().join("out"));
        let converter = CountingConverter::new(2);

        rasterize_blocking(&converter, &pdf, &layout, RasterCachePolicy::Verify).unwrap();
        let again = rasterize_blocking(&converter, &pdf, &layout, RasterCachePolicy::Verify).unwrap();

        assert_eq!(converter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(again.len(), 2);
    }

    #[test]
    fn verify_policy_purges_images_of_another_document() {
        let dir = TempDir::new().unwrap();
        let first = write_pdf(dir.path(), "first.pdf", b"first");
        let second = write_pdf(dir.path(), "second.pdf", b"second");
        let layout = PageLayout::new(dir.path().join("out"));

        rasterize_blocking(&CountingConverter::new(3), &first, &layout, RasterCachePolicy::Verify)
            .unwrap();
        std::fs::write(layout.page(3).text, "stale text").unwrap();

        let converter = CountingConverter::new(2);
        let pages =
            rasterize_blocking(&converter, &second, &layout, RasterCachePolicy::Verify).unwrap();

        assert_eq!(converter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pages.len(), 2);
        assert!(!layout.page(3).image.exists());
        assert!(!layout.page(3).text.exists());
        assert_eq!(layout.read_manifest().unwrap().document, "second.pdf");
    }

    #[test]
    fn converter_errors_propagate() {
        struct Failing;
        impl PdfConverter for Failing {
            fn convert(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>> {
                Err(PdfQaError::CorruptPdf {
                    path: pdf_path.to_path_buf(),
                    detail: "bad xref".into(),
                })
            }
        }

        let dir = TempDir::new().unwrap();
        let pdf = write_pdf(dir.path(), "broken.pdf", b"");
        let layout = PageLayout::new(dir.path().join("out"));
        let err = rasterize_blocking(&Failing, &pdf, &layout, RasterCachePolicy::Trust).unwrap_err();
        assert!(matches!(err, PdfQaError::CorruptPdf { .. }));
        assert!(layout.scan().unwrap().is_empty());
    }

    #[tokio::test]
    async fn async_wrapper_runs_on_blocking_pool() {
        let dir = TempDir::new().unwrap();
        let pdf = write_pdf(dir.path(), "guide.pdf", b"a");
        let layout = PageLayout::new(dir.path().join("out"));
        let converter: Arc<dyn PdfConverter> = Arc::new(CountingConverter::new(1));

        let pages = rasterize(converter, &pdf, &layout, RasterCachePolicy::Trust)
            .await
            .unwrap();
        assert_eq!(pages, vec![layout.page(1)]);
    }
}
