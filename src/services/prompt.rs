use serde::Serialize;

use crate::services::pdf::Snippet;
use crate::services::persona::{decorate, Persona};
use crate::session::Message;

/// System instruction sent unchanged with every chat request.
pub const PREAMBLE: &str = include_str!("../../prompts/email_preamble.txt");

pub const GREETING: &str = "Hi! I am an email drafter bot that can help you write any kind of email you want given a description of the prompt.";

pub const PAGE_TITLE: &str = "💬 Email Drafter";

/// Context overflow policy requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PromptTruncation {
    /// Drop the oldest history when the payload exceeds the model's limit.
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub chat_history: Vec<Message>,
    pub message: String,
    pub prompt_truncation: PromptTruncation,
    pub preamble: &'static str,
    pub documents: Vec<Snippet>,
}

pub fn build_request(
    history: &[Message],
    user_text: &str,
    persona: Persona,
    documents: &[Snippet],
) -> ChatRequest {
    ChatRequest {
        chat_history: history.to_vec(),
        message: decorate(user_text, persona),
        prompt_truncation: PromptTruncation::Auto,
        preamble: PREAMBLE,
        documents: documents.to_vec(),
    }
}
