//! OCR provider client: token exchange and single-image text recognition.
//!
//! Recognition is two-step. [`OcrProvider::authenticate`] trades an API
//! key/secret pair for a short-lived access token and returns a
//! [`TextRecognizer`] bound to that token; the recognizer then turns one page
//! image into one page text. [`BaiduOcr`] implements both against the Baidu
//! `general_basic` API.
//!
//! ## Degraded recognition
//!
//! A recognition response without `words_result` (quota exceeded, image
//! rejected, …) yields an empty page text instead of an error. The provider's
//! `error_msg` is logged at WARN so the cause is not lost.

use crate::config::{OcrEndpoints, PipelineConfig};
use crate::error::{PdfQaError, Result};
use crate::pipeline::encode;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// API key / secret pair for the OCR provider. Never persisted.
#[derive(Clone, Deserialize)]
pub struct OcrCredentials {
    pub api_key: String,
    pub secret_key: String,
}

impl OcrCredentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    fn ensure_present(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(PdfQaError::MissingCredentials("API key is empty".into()));
        }
        if self.secret_key.trim().is_empty() {
            return Err(PdfQaError::MissingCredentials("secret key is empty".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for OcrCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrCredentials")
            .field("api_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Extracts the text of a single page image.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &Path) -> Result<String>;
}

/// An OCR service that issues authenticated recognizers.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn authenticate(&self, credentials: &OcrCredentials) -> Result<Box<dyn TextRecognizer>>;
}

// ── Baidu OCR ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResponse {
    words_result: Option<Vec<WordsItem>>,
    error_code: Option<i64>,
    error_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WordsItem {
    words: String,
}

/// Baidu OCR (`general_basic`) provider.
#[derive(Debug, Clone)]
pub struct BaiduOcr {
    http: reqwest::Client,
    endpoints: OcrEndpoints,
}

impl BaiduOcr {
    pub fn new(http: reqwest::Client, endpoints: OcrEndpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(config.http_client()?, config.ocr.clone()))
    }
}

#[async_trait]
impl OcrProvider for BaiduOcr {
    async fn authenticate(&self, credentials: &OcrCredentials) -> Result<Box<dyn TextRecognizer>> {
        let token = fetch_access_token(&self.http, &self.endpoints.token_url, credentials).await?;
        Ok(Box::new(BaiduRecognizer {
            http: self.http.clone(),
            recognize_url: self.endpoints.recognize_url.clone(),
            access_token: token,
        }))
    }
}

/// Exchange an API key/secret pair for an access token (client-credentials grant).
pub async fn fetch_access_token(
    http: &reqwest::Client,
    token_url: &str,
    credentials: &OcrCredentials,
) -> Result<String> {
    credentials.ensure_present()?;

    let response = http
        .post(token_url)
        .query(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.api_key.as_str()),
            ("client_secret", credentials.secret_key.as_str()),
        ])
        .send()
        .await
        .map_err(|e| PdfQaError::TokenExchangeFailed {
            reason: e.to_string(),
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| PdfQaError::TokenExchangeFailed {
            reason: e.to_string(),
        })?;

    let parsed: TokenResponse =
        serde_json::from_str(&body).map_err(|e| PdfQaError::TokenExchangeFailed {
            reason: format!("HTTP {status}, unparseable body ({e}): {body}"),
        })?;

    match parsed.access_token {
        Some(token) if !token.is_empty() => {
            info!("OCR access token acquired");
            Ok(token)
        }
        _ => Err(PdfQaError::TokenMissing {
            detail: parsed
                .error_description
                .or(parsed.error)
                .unwrap_or_else(|| format!("HTTP {status}")),
        }),
    }
}

/// A recognizer holding a Baidu access token.
pub struct BaiduRecognizer {
    http: reqwest::Client,
    recognize_url: String,
    access_token: String,
}

impl fmt::Debug for BaiduRecognizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaiduRecognizer")
            .field("recognize_url", &self.recognize_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl TextRecognizer for BaiduRecognizer {
    async fn recognize(&self, image: &Path) -> Result<String> {
        let b64 = encode::encode_image_file(image).await?;

        let response = self
            .http
            .post(&self.recognize_url)
            .query(&[("access_token", self.access_token.as_str())])
            .form(&[("image", b64.as_str())])
            .send()
            .await
            .map_err(|e| PdfQaError::RecognitionFailed {
                path: image.to_path_buf(),
                reason: e.to_string(),
            })?;

        let body = response
            .text()
            .await
            .map_err(|e| PdfQaError::RecognitionFailed {
                path: image.to_path_buf(),
                reason: e.to_string(),
            })?;

        let text = page_text_from_response(&body).map_err(|e| PdfQaError::RecognitionFailed {
            path: image.to_path_buf(),
            reason: format!("unparseable response ({e}): {body}"),
        })?;
        debug!("Recognised {} → {} chars", image.display(), text.len());
        Ok(text)
    }
}

/// Join the provider's text fragments, in order, into one page text.
///
/// A JSON body lacking `words_result` degrades to an empty string.
pub fn page_text_from_response(body: &str) -> std::result::Result<String, serde_json::Error> {
    let parsed: RecognitionResponse = serde_json::from_str(body)?;
    match parsed.words_result {
        Some(items) => Ok(items
            .into_iter()
            .map(|item| item.words)
            .collect::<Vec<_>>()
            .join("\n")),
        None => {
            warn!(
                "OCR response carried no text (error_code={:?}, error_msg={:?})",
                parsed.error_code, parsed.error_msg
            );
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_are_newline_joined_in_order() {
        let body = r#"{"log_id":1,"words_result_num":3,"words_result":[{"words":"Canine"},{"words":"parvovirus"},{"words":"symptoms"}]}"#;
        assert_eq!(page_text_from_response(body).unwrap(), "Canine\nparvovirus\nsymptoms");
    }

    #[test]
    fn missing_words_result_degrades_to_empty_text() {
        let body = r#"{"error_code":17,"error_msg":"Open api daily request limit reached"}"#;
        assert_eq!(page_text_from_response(body).unwrap(), "");
    }

    #[test]
    fn empty_words_result_is_empty_text() {
        assert_eq!(page_text_from_response(r#"{"words_result":[]}"#).unwrap(), "");
    }

    #[test]
    fn non_json_body_is_an_error() {
        assert!(page_text_from_response("<html>502 Bad Gateway</html>").is_err());
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = OcrCredentials::new("ak-123", "sk-456");
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("ak-123"));
        assert!(!dbg.contains("sk-456"));
    }

    #[tokio::test]
    async fn blank_credentials_fail_before_any_request() {
        let http = reqwest::Client::new();
        // Unroutable URL: reaching it would be a different error.
        let err = fetch_access_token(&http, "http://127.0.0.1:9/token", &OcrCredentials::new("", "s"))
            .await
            .unwrap_err();
        assert!(matches!(err, PdfQaError::MissingCredentials(_)));
    }
}
