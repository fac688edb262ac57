//! On-disk layout of the page cache: one image and one text file per page.
//!
//! ```text
//! output_images/
//!   document.json   raster manifest (source name, SHA-256, page count)
//!   page_1.jpg      rasterised page 1
//!   page_1.txt      OCR text of page 1 (present once recognised)
//!   page_2.jpg
//!   ...
//! ```
//!
//! Paths are derived from the page index through [`PageLayout::page`], never
//! by rewriting one path into another. Discovery ([`PageLayout::scan`]) parses
//! the index back out of `page_<N>.jpg` and orders pages numerically.

use crate::error::{PdfQaError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

static RE_PAGE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^page_(\d+)\.jpg$").unwrap());

const MANIFEST_FILE: &str = "document.json";

/// The cache artifacts belonging to one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageArtifacts {
    /// 1-based page index; determines processing and concatenation order.
    pub index: usize,
    /// Rasterised page image.
    pub image: PathBuf,
    /// Cached OCR text. Authoritative while it exists.
    pub text: PathBuf,
}

impl PageArtifacts {
    /// True once the page has been recognised and its text persisted.
    pub fn has_cached_text(&self) -> bool {
        self.text.is_file()
    }
}

/// Provenance of the images in an output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterManifest {
    /// File name of the source PDF.
    pub document: String,
    /// Hex SHA-256 of the source PDF bytes.
    pub sha256: String,
    /// Number of page images written.
    pub pages: usize,
}

/// Maps page indices to artifact paths inside one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    dir: PathBuf,
}

impl PageLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifacts for the 1-based page `index`.
    pub fn page(&self, index: usize) -> PageArtifacts {
        PageArtifacts {
            index,
            image: self.dir.join(format!("page_{index}.jpg")),
            text: self.dir.join(format!("page_{index}.txt")),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Discover the page images already present, in page order.
    ///
    /// A missing directory yields an empty list. `.jpg` files that do not
    /// follow the `page_<N>.jpg` scheme are skipped with a warning.
    pub fn scan(&self) -> Result<Vec<PageArtifacts>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PdfQaError::cache_io(&self.dir, e)),
        };

        let mut pages = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PdfQaError::cache_io(&self.dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            match parse_page_index(name) {
                Some(index) => pages.push(self.page(index)),
                None if name.ends_with(".jpg") => {
                    warn!("Ignoring image with unexpected name: {}", entry.path().display());
                }
                None => {}
            }
        }

        pages.sort_by_key(|p| p.index);
        debug!("Found {} cached page images in {}", pages.len(), self.dir.display());
        Ok(pages)
    }

    /// Read the raster manifest, if one exists and parses.
    pub fn read_manifest(&self) -> Option<RasterManifest> {
        let path = self.manifest_path();
        let raw = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&raw) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!("Ignoring unreadable manifest {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn write_manifest(&self, manifest: &RasterManifest) -> Result<()> {
        let path = self.manifest_path();
        let json = serde_json::to_vec_pretty(manifest)
            .map_err(|e| PdfQaError::Internal(format!("manifest serialisation: {e}")))?;
        std::fs::write(&path, json).map_err(|e| PdfQaError::cache_io(path, e))
    }

    /// Delete the given pages' images and cached texts, plus the manifest.
    pub fn purge(&self, pages: &[PageArtifacts]) -> Result<()> {
        for page in pages {
            for path in [&page.image, &page.text] {
                remove_if_exists(path)?;
            }
        }
        remove_if_exists(&self.manifest_path())
    }
}

fn parse_page_index(file_name: &str) -> Option<usize> {
    let caps = RE_PAGE_IMAGE.captures(file_name)?;
    caps[1].parse::<usize>().ok().filter(|&i| i >= 1)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PdfQaError::cache_io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn page_paths_follow_index() {
        let layout = PageLayout::new("out");
        let p = layout.page(7);
        assert_eq!(p.index, 7);
        assert_eq!(p.image, PathBuf::from("out/page_7.jpg"));
        assert_eq!(p.text, PathBuf::from("out/page_7.txt"));
    }

    #[test]
    fn parse_page_index_accepts_only_the_scheme() {
        assert_eq!(parse_page_index("page_1.jpg"), Some(1));
        assert_eq!(parse_page_index("page_12.jpg"), Some(12));
        assert_eq!(parse_page_index("page_0.jpg"), None);
        assert_eq!(parse_page_index("page_1.txt"), None);
        assert_eq!(parse_page_index("cover.jpg"), None);
        assert_eq!(parse_page_index("page_x.jpg"), None);
    }

    #[test]
    fn scan_orders_pages_numerically() {
        let dir = TempDir::new().unwrap();
        for i in [10, 2, 1, 11, 3] {
            std::fs::write(dir.path().join(format!("page_{i}.jpg")), b"jpg").unwrap();
        }
        std::fs::write(dir.path().join("page_2.txt"), b"text").unwrap();
        std::fs::write(dir.path().join("notes.jpg"), b"stray").unwrap();

        let pages = PageLayout::new(dir.path()).scan().unwrap();
        let indices: Vec<usize> = pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 10, 11]);
        assert!(pages[1].has_cached_text());
        assert!(!pages[0].has_cached_text());
    }

    #[test]
    fn scan_of_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let pages = PageLayout::new(dir.path().join("absent")).scan().unwrap();
        assert!(pages.is_empty());
    }

    #[test]
    fn purge_removes_images_texts_and_manifest() {
        let dir = TempDir::new().unwrap();
        let layout = PageLayout::new(dir.path());
        let page = layout.page(1);
        std::fs::write(&page.image, b"jpg").unwrap();
        std::fs::write(&page.text, b"text").unwrap();
        layout
            .write_manifest(&RasterManifest {
                document: "a.pdf".into(),
                sha256: "00".into(),
                pages: 1,
            })
            .unwrap();

        layout.purge(&[page.clone(), layout.page(2)]).unwrap();
        assert!(!page.image.exists());
        assert!(!page.text.exists());
        assert!(layout.read_manifest().is_none());
    }
}
