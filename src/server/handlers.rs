//! API request handlers.

use super::{
    error::ApiError,
    types::{ApiState, AskRequest, AskResponse, HealthResponse, OcrForm, OcrResponse, UploadResponse},
};
use crate::error::PdfQaError;
use crate::pipeline::input;
use crate::pipeline::layout::PageLayout;
use crate::session;
use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    Form, Json,
};
use tracing::info;

/// Upload endpoint handler.
///
/// POST /upload_pdf
///
/// Accepts multipart form data with a `pdf` file field. The file is stored in
/// the uploads directory and rasterised into the output directory. The new
/// document becomes current and any previous context is dropped.
pub async fn upload_pdf_handler(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request("msg", e.to_string()))?
    {
        if field.name() != Some("pdf") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request("msg", e.to_string()))?;
        upload = Some((file_name, data));
    }

    let (file_name, data) = upload.ok_or_else(|| ApiError::bad_request("msg", "No file uploaded in field 'pdf'"))?;

    let pdf_path = input::store_upload(&state.config.uploads_dir, &file_name, &data)
        .await
        .map_err(|e| ApiError::from_error("msg", e))?;

    let document = session::open_document(state.converter.clone(), &state.config, &pdf_path)
        .await
        .map_err(|e| ApiError::from_error("msg", e))?;
    let pages = document.pages.len();
    let name = document.name.clone();

    state.session.write().await.set_document(document);

    Ok(Json(UploadResponse {
        msg: format!("PDF '{name}' uploaded and converted to {pages} page images"),
        pages,
    }))
}

/// OCR endpoint handler.
///
/// POST /ocr
///
/// Form fields `baidu_api_key` and `baidu_secret_key`. Runs a cached OCR pass
/// over the current document's pages and replaces the session context.
pub async fn ocr_handler(
    State(state): State<ApiState>,
    Form(form): Form<OcrForm>,
) -> Result<Json<OcrResponse>, ApiError> {
    let layout = PageLayout::new(&state.config.output_dir);
    let (document, pages) = {
        let current = state.session.read().await;
        let pages = current.pages(&layout).map_err(|e| ApiError::from_error("msg", e))?;
        (current.document().map(|d| d.name.clone()), pages)
    };

    let (context, pass) = session::build_context(
        document.as_deref(),
        &pages,
        state.ocr.as_ref(),
        &form.into(),
        None,
    )
    .await
    .map_err(|e| ApiError::from_error("msg", e))?;

    let text = context.text.clone();
    {
        let mut current = state.session.write().await;
        if current.document().map(|d| d.name.as_str()) != document.as_deref() {
            return Err(ApiError::from_error(
                "msg",
                PdfQaError::Internal("a different PDF was uploaded during OCR; run OCR again".into()),
            ));
        }
        current.replace_context(context);
    }

    info!(
        "Context ready: {} pages, {} recognised, {} chars",
        pass.pages,
        pass.recognized,
        text.len()
    );
    Ok(Json(OcrResponse {
        msg: format!(
            "OCR complete: {} pages ({} recognised, {} from cache)",
            pass.pages, pass.recognized, pass.reused
        ),
        context: text,
    }))
}

/// Ask endpoint handler.
///
/// POST /ask
///
/// JSON body `{"question": "..."}`. Answers from the current context.
pub async fn ask_handler(
    State(state): State<ApiState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request("answer", e.body_text()))?;

    let context = state.session.read().await.context();
    let answer = session::ask(state.answerer.as_ref(), context.as_deref(), &request.question)
        .await
        .map_err(|e| ApiError::from_error("answer", e))?;

    Ok(Json(answer.into()))
}

/// Health check endpoint handler.
///
/// GET /health
pub async fn health_handler(State(state): State<ApiState>) -> Json<HealthResponse> {
    let context_ready = state
        .session
        .read()
        .await
        .context()
        .is_some_and(|c| c.is_established());
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        context_ready,
    })
}
