//! Image encoding: page image file → base64 payload for the OCR request body.
//!
//! The recognition endpoint takes the image as a standard-alphabet base64
//! string in a form field; the JPEG bytes written by the rasteriser are sent
//! unchanged.

use crate::error::{PdfQaError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

/// Read an image file and base64-encode its bytes.
pub async fn encode_image_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PdfQaError::cache_io(path, e))?;

    let b64 = STANDARD.encode(&bytes);
    debug!("Encoded {} → {} bytes base64", path.display(), b64.len());
    Ok(b64)
}
