//! Input handling: validate local PDFs and store uploaded ones.
//!
//! pdfium needs a file-system path, so uploads are written into the uploads
//! directory before rasterisation. The PDF magic bytes (`%PDF`) are checked
//! first so callers get a meaningful error rather than a pdfium failure.

use crate::error::{PdfQaError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Validate that `path` exists, is readable, and starts with `%PDF`.
pub fn validate_pdf(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(PdfQaError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(PdfQaError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PdfQaError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(PdfQaError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Validated local PDF: {}", path.display());
    Ok(())
}

/// Reduce a client-supplied file name to a safe final path component.
///
/// Directory parts are dropped, so `../../etc/passwd` becomes `passwd`.
/// Returns `None` when nothing usable remains.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}

/// Write uploaded PDF bytes into `uploads_dir` and return the stored path.
pub async fn store_upload(uploads_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let name = sanitize_file_name(file_name)
        .ok_or_else(|| PdfQaError::InvalidUpload(format!("unusable file name '{file_name}'")))?;

    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(PdfQaError::NotAPdf {
            path: PathBuf::from(name),
            magic,
        });
    }

    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(|e| PdfQaError::cache_io(uploads_dir, e))?;

    let path = uploads_dir.join(&name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| PdfQaError::cache_io(&path, e))?;

    info!("Stored upload: {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Hex SHA-256 of a file's contents.
pub fn fingerprint(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| PdfQaError::cache_io(path, e))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
