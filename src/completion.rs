//! Question answering: send context + question to a completion provider.
//!
//! Prompt engineering lives in [`crate::prompts`]; this module only builds the
//! two-message request and interprets the reply.
//!
//! ## Message Layout
//!
//! 1. **System message** — assistant persona (or the configured override)
//! 2. **User message** — the document context followed by the question
//!
//! ## Degraded answers
//!
//! A reply that does not carry `choices[0].message.content` is returned as
//! [`Answer::Degraded`] holding the raw body, never as an error. Only a
//! failure to reach the provider at all is an `Err`.
//!
//! Two backends implement [`Answerer`]: [`ChatCompletionClient`] talks to an
//! OpenAI-style chat-completions endpoint directly (DeepSeek by default), and
//! [`ProviderAnswerer`] routes through any `edgequake-llm` provider.

use crate::config::{CompletionSettings, PipelineConfig, COMPLETION_API_KEY_VAR};
use crate::error::{PdfQaError, Result};
use crate::prompts::{question_message, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The result of a question-answering call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// The provider's first completion.
    Complete(String),
    /// The provider replied without a completion; `raw` is its response body.
    Degraded { raw: String },
}

impl Answer {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Answer::Degraded { .. })
    }

    /// The text shown to the end user.
    pub fn into_text(self) -> String {
        match self {
            Answer::Complete(text) => text,
            degraded => degraded.to_string(),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Complete(text) => f.write_str(text),
            Answer::Degraded { raw } => {
                write!(f, "Something went wrong, the completion API returned: {raw}")
            }
        }
    }
}

/// Answers a question from a document context.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<Answer>;
}

/// Pick the backend named by the configuration.
pub fn build_answerer(config: &PipelineConfig) -> Result<Arc<dyn Answerer>> {
    match config.completion.provider_name {
        Some(_) => Ok(Arc::new(ProviderAnswerer::from_settings(&config.completion)?)),
        None => Ok(Arc::new(ChatCompletionClient::new(
            config.http_client()?,
            &config.completion,
        ))),
    }
}

// ── Direct chat-completions client ───────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatTurn {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Client for an OpenAI-style `/v1/chat/completions` endpoint.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    system_prompt: String,
    temperature: Option<f32>,
}

impl fmt::Debug for ChatCompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ChatCompletionClient {
    pub fn new(http: reqwest::Client, settings: &CompletionSettings) -> Self {
        Self {
            http,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            system_prompt: settings
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: settings.temperature,
        }
    }
}

#[async_trait]
impl Answerer for ChatCompletionClient {
    async fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        let api_key = self.api_key.as_deref().ok_or(PdfQaError::MissingApiKey {
            var: COMPLETION_API_KEY_VAR,
        })?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatTurn {
                    role: "system",
                    content: self.system_prompt.clone(),
                },
                ChatTurn {
                    role: "user",
                    content: question_message(context, question),
                },
            ],
            temperature: self.temperature,
        };

        let start = Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PdfQaError::CompletionFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PdfQaError::CompletionFailed {
                reason: e.to_string(),
            })?;

        let answer = parse_completion(&body);
        if answer.is_degraded() {
            warn!("Completion API returned no choices (HTTP {})", status);
        } else {
            debug!("Completion answered in {:?}", start.elapsed());
        }
        Ok(answer)
    }
}

/// Interpret a chat-completions response body.
pub fn parse_completion(body: &str) -> Answer {
    match serde_json::from_str::<ChatResponse>(body) {
        Ok(ChatResponse {
            choices: Some(choices),
        }) => match choices.into_iter().next() {
            Some(choice) => Answer::Complete(choice.message.content),
            None => Answer::Degraded {
                raw: body.to_string(),
            },
        },
        _ => Answer::Degraded {
            raw: body.to_string(),
        },
    }
}

// ── edgequake-llm backend ────────────────────────────────────────────────

/// [`Answerer`] backed by an `edgequake-llm` provider.
pub struct ProviderAnswerer {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    temperature: Option<f32>,
}

impl ProviderAnswerer {
    pub fn new(provider: Arc<dyn LLMProvider>, settings: &CompletionSettings) -> Self {
        Self {
            provider,
            system_prompt: settings
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: settings.temperature,
        }
    }

    /// Instantiate the provider named in `settings` with `settings.model`.
    ///
    /// The provider reads its own API key variable (`OPENAI_API_KEY`, …).
    pub fn from_settings(settings: &CompletionSettings) -> Result<Self> {
        let name = settings.provider_name.as_deref().unwrap_or("openai");
        let provider = ProviderFactory::create_llm_provider(name, &settings.model).map_err(|e| {
            PdfQaError::ProviderNotConfigured {
                provider: name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        info!("Answering through edgequake-llm provider '{}'", name);
        Ok(Self::new(provider, settings))
    }
}

#[async_trait]
impl Answerer for ProviderAnswerer {
    async fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(question_message(context, question).as_str()),
        ];
        let options = CompletionOptions {
            temperature: self.temperature,
            ..Default::default()
        };

        match self.provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "{} input tokens, {} output tokens",
                    response.prompt_tokens, response.completion_tokens
                );
                Ok(Answer::Complete(response.content))
            }
            Err(e) => {
                warn!("LLM provider call failed: {}", e);
                Ok(Answer::Degraded { raw: e.to_string() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_response_yields_first_choice() {
        let body = r#"{"choices":[{"message":{"content":"X"}}]}"#;
        assert_eq!(parse_completion(body), Answer::Complete("X".into()));
    }

    #[test]
    fn only_the_first_choice_is_used() {
        let body = r#"{"id":"c1","choices":[{"index":0,"message":{"role":"assistant","content":"first"}},{"index":1,"message":{"role":"assistant","content":"second"}}]}"#;
        assert_eq!(parse_completion(body).into_text(), "first");
    }

    #[test]
    fn missing_choices_is_degraded_with_raw_body() {
        let body = r#"{"error":{"message":"Authentication Fails","type":"authentication_error"}}"#;
        let answer = parse_completion(body);
        assert!(answer.is_degraded());
        let text = answer.into_text();
        assert!(text.contains("Authentication Fails"), "got: {text}");
    }

    #[test]
    fn empty_choices_and_non_json_are_degraded() {
        assert!(parse_completion(r#"{"choices":[]}"#).is_degraded());
        assert!(parse_completion("upstream timed out").is_degraded());
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_before_any_request() {
        let client = ChatCompletionClient::new(reqwest::Client::new(), &CompletionSettings::default());
        let err = client.answer("q", "ctx").await.unwrap_err();
        assert!(matches!(err, PdfQaError::MissingApiKey { var: "DEEPSEEK_API_KEY" }));
    }

    #[test]
    fn request_serialises_system_then_user() {
        let req = ChatRequest {
            model: "deepseek-chat",
            messages: vec![
                ChatTurn {
                    role: "system",
                    content: "persona".into(),
                },
                ChatTurn {
                    role: "user",
                    content: question_message("ctx", "q"),
                },
            ],
            temperature: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "deepseek-chat");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(json.get("temperature").is_none());
    }
}
