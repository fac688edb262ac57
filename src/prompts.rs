//! Prompts for the question-answering completion call.
//!
//! Callers can override the system prompt via
//! [`crate::config::CompletionSettings::system_prompt`]; the constant here is
//! used only when no override is provided.

/// Default system prompt: the assistant persona and answering register.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a preliminary animal-health assistant for ordinary pet owners. \
Answer questions in plain, easy-to-understand language, based on the reference material you are given.";

/// Build the user message embedding the document context and the question.
pub fn question_message(context: &str, question: &str) -> String {
    format!("Refer to the following material: {context}\n\nQuestion: {question}")
}
