//! Provider clients against in-process fake OCR and completion services.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::post,
    Form, Json, Router,
};
use base64::Engine;
use pdf_qa::completion::ChatCompletionClient;
use pdf_qa::config::{CompletionSettings, OcrEndpoints};
use pdf_qa::{Answer, Answerer, BaiduOcr, OcrCredentials, OcrProvider, PdfQaError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ── Fake OCR service ─────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct OcrLog {
    images: Arc<Mutex<Vec<Vec<u8>>>>,
}

async fn token(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let valid = q.get("grant_type").map(String::as_str) == Some("client_credentials")
        && q.get("client_id").map(String::as_str) == Some("good-key")
        && q.get("client_secret").map(String::as_str) == Some("good-secret");
    if valid {
        Json(json!({"access_token": "tok-1", "expires_in": 2592000}))
    } else {
        Json(json!({"error": "invalid_client", "error_description": "unknown client id"}))
    }
}

async fn recognize(
    State(log): State<OcrLog>,
    Query(q): Query<HashMap<String, String>>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    if q.get("access_token").map(String::as_str) != Some("tok-1") {
        return Json(json!({"error_code": 110, "error_msg": "Access token invalid or no longer valid"}));
    }
    let image = base64::engine::general_purpose::STANDARD
        .decode(form.get("image").cloned().unwrap_or_default())
        .unwrap_or_default();
    let quota_exhausted = image.starts_with(b"quota");
    log.images.lock().unwrap().push(image);
    if quota_exhausted {
        return Json(json!({"error_code": 17, "error_msg": "Open api daily request limit reached"}));
    }
    Json(json!({
        "words_result_num": 2,
        "words_result": [{"words": "Feed adult cats twice a day."}, {"words": "Fresh water always."}]
    }))
}

async fn fake_ocr() -> (BaiduOcr, OcrLog) {
    let log = OcrLog::default();
    let app = Router::new()
        .route("/oauth/2.0/token", post(token))
        .route("/ocr", post(recognize))
        .with_state(log.clone());
    let base = spawn(app).await;
    let endpoints = OcrEndpoints {
        token_url: format!("{base}/oauth/2.0/token"),
        recognize_url: format!("{base}/ocr"),
    };
    (BaiduOcr::new(reqwest::Client::new(), endpoints), log)
}

#[tokio::test]
async fn recognises_a_page_with_a_fresh_token() {
    let (ocr, log) = fake_ocr().await;
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("page_1.jpg");
    std::fs::write(&image, b"\xFF\xD8\xFFjpeg bytes").unwrap();

    let recognizer = ocr
        .authenticate(&OcrCredentials::new("good-key", "good-secret"))
        .await
        .unwrap();
    let text = recognizer.recognize(&image).await.unwrap();

    assert_eq!(text, "Feed adult cats twice a day.\nFresh water always.");
    assert_eq!(log.images.lock().unwrap()[0], b"\xFF\xD8\xFFjpeg bytes");
}

#[tokio::test]
async fn token_without_access_token_fails_fast() {
    let (ocr, log) = fake_ocr().await;

    let err = ocr
        .authenticate(&OcrCredentials::new("bad-key", "good-secret"))
        .await
        .err()
        .unwrap();

    match err {
        PdfQaError::TokenMissing { detail } => assert_eq!(detail, "unknown client id"),
        other => panic!("expected TokenMissing, got {other:?}"),
    }
    assert!(log.images.lock().unwrap().is_empty());
}

#[tokio::test]
async fn response_without_words_result_is_empty_text() {
    let (ocr, _log) = fake_ocr().await;
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("page_1.jpg");
    std::fs::write(&image, b"quota").unwrap();

    let recognizer = ocr
        .authenticate(&OcrCredentials::new("good-key", "good-secret"))
        .await
        .unwrap();
    assert_eq!(recognizer.recognize(&image).await.unwrap(), "");
}

#[tokio::test]
async fn unreachable_token_endpoint_is_an_exchange_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let ocr = BaiduOcr::new(
        reqwest::Client::new(),
        OcrEndpoints {
            token_url: format!("http://{addr}/token"),
            recognize_url: format!("http://{addr}/ocr"),
        },
    );
    let err = ocr
        .authenticate(&OcrCredentials::new("good-key", "good-secret"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, PdfQaError::TokenExchangeFailed { .. }));
}

// ── Fake completion service ──────────────────────────────────────────────────

#[derive(Clone, Default)]
struct ChatLog {
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn chat(State(log): State<ChatLog>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let authorised = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer sk-test");
    log.requests.lock().unwrap().push(body.clone());
    if !authorised {
        return Json(json!({"error": {"message": "Authentication Fails", "type": "authentication_error"}}));
    }
    let user = body["messages"][1]["content"].as_str().unwrap_or_default();
    Json(json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": format!("echo: {}", user.len())}}]
    }))
}

async fn fake_completion(api_key: &str) -> (ChatCompletionClient, ChatLog) {
    let log = ChatLog::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(chat))
        .with_state(log.clone());
    let base = spawn(app).await;
    let settings = CompletionSettings {
        endpoint: format!("{base}/v1/chat/completions"),
        api_key: Some(api_key.to_string()),
        ..Default::default()
    };
    (ChatCompletionClient::new(reqwest::Client::new(), &settings), log)
}

#[tokio::test]
async fn completion_sends_persona_then_context_and_question() {
    let (client, log) = fake_completion("sk-test").await;

    let answer = client
        .answer("How much should a kitten eat?", "Kittens eat four small meals.\n")
        .await
        .unwrap();
    assert!(matches!(answer, Answer::Complete(ref text) if text.starts_with("echo: ")));

    let requests = log.requests.lock().unwrap();
    let body = &requests[0];
    assert_eq!(body["model"], "deepseek-chat");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    let user = body["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("Kittens eat four small meals."));
    assert!(user.ends_with("How much should a kitten eat?"));
}

#[tokio::test]
async fn completion_without_choices_is_degraded() {
    let (client, _log) = fake_completion("sk-wrong").await;

    let answer = client.answer("q", "context\n").await.unwrap();
    assert!(answer.is_degraded());
    assert!(answer.into_text().contains("Authentication Fails"));
}

#[tokio::test]
async fn unreachable_completion_endpoint_is_an_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let settings = CompletionSettings {
        endpoint: format!("http://{addr}/v1/chat/completions"),
        api_key: Some("sk-test".into()),
        ..Default::default()
    };
    let client = ChatCompletionClient::new(reqwest::Client::new(), &settings);
    let err = client.answer("q", "context\n").await.unwrap_err();
    assert!(matches!(err, PdfQaError::CompletionFailed { .. }));
}
